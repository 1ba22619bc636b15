//! Sigil CLI - Command line interface.

use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use sigil_crypto::{
    cipher, mac, signature, AlgorithmSpec, BigUint, CipherReader, CipherWriter, DigestAlgorithm,
    DigestHandle, Direction, KeyAlgorithm, KeyComponents, KeyKind, KeyMaterial, MacAlgorithm,
    SignatureAlgorithm, StreamConfig, Transformation,
};
use sigil_seal::SealedValue;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use zeroize::Zeroizing;

// ============================================================================
// CLI Structure
// ============================================================================

#[derive(Parser)]
#[command(name = "sigil")]
#[command(about = "Sigil - Digests, MACs, keys, ciphers and signatures")]
#[command(version)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Chunk size used when streaming files
    #[arg(long, global = true, default_value = "8192", env = "SIGIL_BUFFER_SIZE")]
    buffer_size: usize,

    /// Hex seed for deterministic key generation (test vectors only, NOT secure)
    #[arg(long, global = true, env = "SIGIL_INSECURE_SEED")]
    insecure_seed: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Hash a file (or stdin)
    Digest {
        /// Digest algorithm (MD5, SHA-1, SHA-256, SHA-384, SHA-512)
        #[arg(short, long, default_value = "SHA-256")]
        algorithm: DigestAlgorithm,
        /// Input file, stdin if omitted
        input: Option<PathBuf>,
    },
    /// Compute or verify an HMAC over a file (or stdin)
    Mac {
        /// MAC algorithm (HmacMD5, HmacSHA1, HmacSHA256, HmacSHA512)
        #[arg(short, long, default_value = "HmacSHA256")]
        algorithm: MacAlgorithm,
        /// Hex-encoded key
        #[arg(short, long)]
        key: String,
        /// Expected hex tag; exits with an error on mismatch
        #[arg(long)]
        verify: Option<String>,
        /// Input file, stdin if omitted
        input: Option<PathBuf>,
    },
    /// Generate a key and print it
    Keygen {
        /// Key algorithm (AES, DES, DESede, RSA, DSA, Hmac*)
        #[arg(short, long)]
        algorithm: KeyAlgorithm,
        /// Key size in bits
        #[arg(short, long)]
        bits: Option<usize>,
    },
    /// Encrypt a file with a secret key
    Encrypt {
        /// Transformation, e.g. AES/CBC/PKCS5Padding
        #[arg(short, long, default_value = "AES/CBC/PKCS5Padding")]
        transformation: Transformation,
        /// Hex-encoded secret key
        #[arg(short, long)]
        key: String,
        /// Hex IV; generated and printed when omitted
        #[arg(long)]
        iv: Option<String>,
        /// Input file
        input: PathBuf,
        /// Output file
        output: PathBuf,
    },
    /// Decrypt a file with a secret key
    Decrypt {
        /// Transformation, e.g. AES/CBC/PKCS5Padding
        #[arg(short, long, default_value = "AES/CBC/PKCS5Padding")]
        transformation: Transformation,
        /// Hex-encoded secret key
        #[arg(short, long)]
        key: String,
        /// Hex IV printed by `encrypt`
        #[arg(long)]
        iv: Option<String>,
        /// Input file
        input: PathBuf,
        /// Output file
        output: PathBuf,
    },
    /// Walk through every engine on a sample message
    Demo {
        /// Message to use
        #[arg(default_value = "abc456")]
        message: String,
    },
}

// ============================================================================
// Helpers
// ============================================================================

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();
}

fn decode_hex(value: &str, what: &str) -> Result<Zeroizing<Vec<u8>>> {
    hex::decode(value.trim())
        .map(Zeroizing::new)
        .with_context(|| format!("{what} is not valid hex"))
}

fn open_input(path: Option<&Path>) -> Result<Box<dyn Read>> {
    match path {
        Some(path) => {
            let file = File::open(path)
                .with_context(|| format!("Failed to open {}", path.display()))?;
            Ok(Box::new(BufReader::new(file)))
        },
        None => Ok(Box::new(io::stdin().lock())),
    }
}

fn feed_all(
    input: &mut dyn Read,
    config: &StreamConfig,
    mut sink: impl FnMut(&[u8]),
) -> Result<()> {
    let mut buf = vec![0u8; config.buffer_size()];
    loop {
        let n = input.read(&mut buf).context("Failed to read input")?;
        if n == 0 {
            return Ok(());
        }
        sink(&buf[..n]);
    }
}

fn secret_key_for(transformation: &Transformation, key_hex: &str) -> Result<KeyMaterial> {
    let algorithm = cipher::resolve(transformation).key_algorithm();
    if algorithm.is_asymmetric() {
        bail!("{transformation} needs an asymmetric key; only secret keys are accepted here");
    }
    let bytes = decode_hex(key_hex, "Key")?;
    KeyMaterial::from_secret_bytes(algorithm, &bytes)
        .with_context(|| format!("Invalid {algorithm} key"))
}

fn spec_for(transformation: Transformation, iv: Option<&str>) -> Result<AlgorithmSpec> {
    let spec = AlgorithmSpec::new(transformation);
    Ok(match iv {
        Some(iv) => spec.with_iv(decode_hex(iv, "IV")?.to_vec()),
        None => spec,
    })
}

fn print_components(components: &KeyComponents) {
    let line = |name: &str, value: &BigUint| println!("  {name:<17} {}", value.to_str_radix(16));

    match components {
        KeyComponents::Secret(bytes) => println!("  key               {}", hex::encode(bytes)),
        KeyComponents::RsaPublic {
            modulus,
            public_exponent,
        } => {
            line("modulus", modulus);
            line("public exponent", public_exponent);
        },
        KeyComponents::RsaPrivate {
            modulus,
            public_exponent,
            private_exponent,
            primes,
        } => {
            line("modulus", modulus);
            line("public exponent", public_exponent);
            line("private exponent", private_exponent);
            for prime in primes {
                line("prime", prime);
            }
        },
        KeyComponents::DsaPublic { p, q, g, y } => {
            line("p", p);
            line("q", q);
            line("g", g);
            line("y", y);
        },
        KeyComponents::DsaPrivate { p, q, g, x } => {
            line("p", p);
            line("q", q);
            line("g", g);
            line("x", x);
        },
    }
}

// ============================================================================
// Command Handlers
// ============================================================================

fn cmd_digest(
    algorithm: DigestAlgorithm,
    input: Option<&Path>,
    config: &StreamConfig,
) -> Result<()> {
    let mut reader = open_input(input)?;
    let mut handle = DigestHandle::start(algorithm);
    feed_all(&mut reader, config, |chunk| handle.feed(chunk))?;

    println!("{}", handle.finish_hex());
    Ok(())
}

fn cmd_mac(
    algorithm: MacAlgorithm,
    key_hex: &str,
    expected: Option<&str>,
    input: Option<&Path>,
    config: &StreamConfig,
) -> Result<()> {
    let secret = decode_hex(key_hex, "Key")?;
    let key = KeyMaterial::from_secret_bytes(algorithm.key_algorithm(), &secret)
        .context("Invalid MAC key")?;
    let mut handle = mac::MacHandle::start(&key, algorithm)?;

    let mut reader = open_input(input)?;
    feed_all(&mut reader, config, |chunk| handle.feed(chunk))?;

    match expected {
        Some(tag) => {
            let tag = hex::decode(tag.trim()).context("Tag is not valid hex")?;
            if !handle.verify(&tag) {
                bail!("MAC mismatch");
            }
            println!("MAC verified");
        },
        None => println!("{}", hex::encode(handle.finish())),
    }
    Ok(())
}

fn cmd_keygen(algorithm: KeyAlgorithm, bits: Option<usize>, seed: Option<&[u8]>) -> Result<()> {
    let key = KeyMaterial::generate(algorithm, bits, seed)
        .with_context(|| format!("Failed to generate {algorithm} key"))?;

    println!("{algorithm} {} key, {} bits", key.kind(), key.bit_length());
    print_components(&key.components());

    if key.kind() == KeyKind::Private {
        println!();
        println!("{algorithm} public key");
        print_components(&key.public_key()?.components());
    }
    Ok(())
}

fn cmd_crypt(
    direction: Direction,
    transformation: Transformation,
    key_hex: &str,
    iv: Option<&str>,
    input: &Path,
    output: &Path,
    config: &StreamConfig,
) -> Result<()> {
    let key = secret_key_for(&transformation, key_hex)?;
    let spec = spec_for(transformation, iv)?;
    let mut session = cipher::init(direction, &key, &spec)
        .with_context(|| format!("Failed to initialize {transformation}"))?;

    let mut reader = BufReader::new(
        File::open(input).with_context(|| format!("Failed to open {}", input.display()))?,
    );
    let mut writer = BufWriter::new(
        File::create(output).with_context(|| format!("Failed to create {}", output.display()))?,
    );

    let written = sigil_crypto::process_stream(&mut session, &mut reader, &mut writer, config)
        .with_context(|| format!("Failed to process {}", input.display()))?;

    info!(%transformation, ?direction, written, "file processed");

    if iv.is_none() && direction == Direction::Encrypt {
        if let Some(parameters) = session.parameters() {
            println!("iv: {}", hex::encode(parameters.iv()));
        }
    }
    println!("{written} bytes written to {}", output.display());
    Ok(())
}

#[derive(Debug, PartialEq, Serialize, Deserialize)]
struct DemoRecord {
    message: String,
    length: usize,
}

fn cmd_demo(message: &str, config: &StreamConfig) -> Result<()> {
    let data = message.as_bytes();
    println!("Message: {message:?} => {data:?}");

    // Digest
    println!();
    println!("== Digests ==");
    for algorithm in [
        DigestAlgorithm::Md5,
        DigestAlgorithm::Sha1,
        DigestAlgorithm::Sha256,
    ] {
        println!(
            "  {:<8} {}",
            algorithm.name(),
            sigil_crypto::digest::digest_hex(algorithm, data)
        );
    }

    // Symmetric cipher with a wrapped key
    println!();
    println!("== DES/CBC with an AES-wrapped key ==");
    let des_key = KeyMaterial::generate(KeyAlgorithm::Des, None, None)?;
    let spec = AlgorithmSpec::parse("DES/CBC/PKCS5Padding")?;

    let mut session = cipher::init(Direction::Encrypt, &des_key, &spec)?;
    let mut ciphertext = session.update(data)?;
    ciphertext.extend(session.finalize()?);
    let parameters = session
        .parameters()
        .cloned()
        .context("CBC encryption produced no IV")?;
    println!("  ciphertext  {}", hex::encode(&ciphertext));
    println!("  iv          {}", hex::encode(parameters.iv()));

    let aes_key = KeyMaterial::generate(KeyAlgorithm::Aes, None, None)?;
    let wrapped = sigil_wrap::wrap(&aes_key, &des_key)?;
    println!("  wrapped key {} bytes", wrapped.len());

    let recovered = sigil_wrap::unwrap(&aes_key, &wrapped, KeyAlgorithm::Des, KeyKind::Secret)?;
    let decrypt_spec = spec.clone().with_parameters(Some(parameters.clone()));
    let plaintext = cipher::decrypt(&recovered, &decrypt_spec, &ciphertext)?;
    println!("  decrypted   {:?}", String::from_utf8_lossy(&plaintext));

    // File streaming
    println!();
    println!("== Stream through a file ==");
    let file = tempfile::NamedTempFile::new().context("Failed to create temporary file")?;
    let mut writer = CipherWriter::new(
        file.reopen()?,
        cipher::init(Direction::Encrypt, &des_key, &decrypt_spec)?,
    );
    writer.write_all(data)?;
    writer.finish()?;

    let mut reader = CipherReader::with_config(
        file.reopen()?,
        cipher::init(Direction::Decrypt, &des_key, &decrypt_spec)?,
        config,
    );
    let mut streamed = Vec::new();
    reader.read_to_end(&mut streamed)?;
    println!("  from file   {:?}", String::from_utf8_lossy(&streamed));

    // Sealed value
    println!();
    println!("== Sealed value ==");
    let sealing_key = KeyMaterial::generate(KeyAlgorithm::Aes, None, None)?;
    let record = DemoRecord {
        message: message.to_string(),
        length: data.len(),
    };
    let sealed = SealedValue::seal_object(&sealing_key, &AlgorithmSpec::parse("AES")?, &record)?;
    println!("  sealed      {sealed}");
    let parsed: SealedValue = sealed
        .to_string()
        .parse()
        .context("Failed to parse sealed value text")?;
    let opened: DemoRecord = parsed.unseal_object(&sealing_key)?;
    println!("  unsealed    {opened:?}");

    // RSA
    println!();
    println!("== RSA ==");
    let rsa_private = KeyMaterial::generate(KeyAlgorithm::Rsa, None, None)?;
    let rsa_public = rsa_private.public_key()?;
    let rsa_spec = AlgorithmSpec::parse("RSA/ECB/PKCS1Padding")?;
    let output = cipher::encrypt(&rsa_public, &rsa_spec, data)?;
    println!("  ciphertext  {} bytes", output.bytes.len());
    let plaintext = cipher::decrypt(&rsa_private, &rsa_spec, &output.bytes)?;
    println!("  decrypted   {:?}", String::from_utf8_lossy(&plaintext));

    let signed = signature::sign(&rsa_private, SignatureAlgorithm::Sha256WithRsa, data)?;
    let verified =
        signature::verify(&rsa_public, SignatureAlgorithm::Sha256WithRsa, data, &signed)?;
    println!("  {} verifies: {verified}", signed.algorithm);

    // DSA
    println!();
    println!("== DSA ==");
    let dsa_private = KeyMaterial::generate(KeyAlgorithm::Dsa, Some(1024), None)?;
    let dsa_public = dsa_private.public_key()?;
    let signed = signature::sign(&dsa_private, SignatureAlgorithm::Sha1WithDsa, data)?;
    let verified = signature::verify(&dsa_public, SignatureAlgorithm::Sha1WithDsa, data, &signed)?;
    println!("  generated key verifies:     {verified}");

    let rebuilt =
        KeyMaterial::reconstruct(KeyAlgorithm::Dsa, KeyKind::Public, dsa_public.components())?;
    let verified = signature::verify(&rebuilt, SignatureAlgorithm::Sha1WithDsa, data, &signed)?;
    println!("  reconstructed key verifies: {verified}");

    let toy = KeyComponents::DsaPrivate {
        p: BigUint::from(293u32),
        q: BigUint::from(149u32),
        g: BigUint::from(253u32),
        x: BigUint::from(207u32),
    };
    match KeyMaterial::reconstruct(KeyAlgorithm::Dsa, KeyKind::Private, toy) {
        Ok(_) => println!("  toy parameters accepted"),
        Err(e) => println!("  toy parameters rejected:   {e}"),
    }

    // HMAC
    println!();
    println!("== HMAC ==");
    let mac_key = KeyMaterial::generate(KeyAlgorithm::HmacMd5, None, None)?;
    let tag = mac::compute(&mac_key, MacAlgorithm::HmacMd5, data)?;
    println!("  HmacMD5     {}", hex::encode(&tag));
    println!(
        "  verifies:   {}",
        mac::verify(&mac_key, MacAlgorithm::HmacMd5, data, &tag)?
    );

    Ok(())
}

// ============================================================================
// Main
// ============================================================================

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = StreamConfig::new(cli.buffer_size).context("Invalid --buffer-size")?;
    let seed = cli
        .insecure_seed
        .as_deref()
        .map(|s| decode_hex(s, "Seed"))
        .transpose()?;

    match cli.command {
        Commands::Digest { algorithm, input } => cmd_digest(algorithm, input.as_deref(), &config),
        Commands::Mac {
            algorithm,
            key,
            verify,
            input,
        } => cmd_mac(algorithm, &key, verify.as_deref(), input.as_deref(), &config),
        Commands::Keygen { algorithm, bits } => {
            cmd_keygen(algorithm, bits, seed.as_deref().map(Vec::as_slice))
        },
        Commands::Encrypt {
            transformation,
            key,
            iv,
            input,
            output,
        } => cmd_crypt(
            Direction::Encrypt,
            transformation,
            &key,
            iv.as_deref(),
            &input,
            &output,
            &config,
        ),
        Commands::Decrypt {
            transformation,
            key,
            iv,
            input,
            output,
        } => cmd_crypt(
            Direction::Decrypt,
            transformation,
            &key,
            iv.as_deref(),
            &input,
            &output,
            &config,
        ),
        Commands::Demo { message } => cmd_demo(&message, &config),
    }
}
