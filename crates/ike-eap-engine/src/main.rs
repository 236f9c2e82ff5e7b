use clap::{Args, Parser, Subcommand};
use ike_eap_engine::EngineConfig;
use ike_eap_proto::crypto::{Prf, PrfAlgorithm};
use ike_eap_proto::eap::ttls::TtlsTypeData;
use ike_eap_proto::{EapPacket, EapType};
use std::process;
use tracing::{debug, error};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// IKEv2 / EAP key derivation and framing tool
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(name = "ike-eap-tool")]
struct Cli {
    /// Engine configuration file (used for the log level)
    #[arg(short, long, global = true, value_name = "CONFIG")]
    config: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Compute SKEYSEED from nonces and the Diffie-Hellman shared secret
    Skeyseed(SkeyseedArgs),
    /// Expand a key with PRF+
    PrfPlus(PrfPlusArgs),
    /// Decode an EAP-TTLS frame
    DecodeFrame(DecodeFrameArgs),
    /// Validate a configuration file, writing an example if it does not exist
    CheckConfig {
        #[arg(value_name = "CONFIG", default_value = "ike-eap.json")]
        path: String,
    },
}

#[derive(Args, Debug)]
struct SkeyseedArgs {
    /// PRF name (e.g. PRF_HMAC_SHA2_256) or transform id
    #[arg(long, default_value = "PRF_HMAC_SHA2_256")]
    prf: String,
    /// Initiator nonce (hex)
    #[arg(long)]
    ni: String,
    /// Responder nonce (hex)
    #[arg(long)]
    nr: String,
    /// Diffie-Hellman shared secret (hex)
    #[arg(long)]
    dh: String,
    /// SK_d of the SA being rekeyed (hex)
    #[arg(long)]
    rekey_sk_d: Option<String>,
}

#[derive(Args, Debug)]
struct PrfPlusArgs {
    #[arg(long, default_value = "PRF_HMAC_SHA2_256")]
    prf: String,
    /// Key (hex)
    #[arg(long)]
    key: String,
    /// Seed (hex)
    #[arg(long)]
    seed: String,
    /// Output length in bytes
    #[arg(long)]
    length: usize,
}

#[derive(Args, Debug)]
struct DecodeFrameArgs {
    /// Frame bytes (hex)
    #[arg(value_name = "HEX")]
    frame: String,
    /// Input is a full EAP packet rather than bare type-data
    #[arg(long)]
    eap: bool,
}

fn parse_prf(value: &str) -> Result<Prf, String> {
    if let Ok(id) = value.parse::<u16>() {
        return Prf::from_transform_id(id).map_err(|e| e.to_string());
    }
    PrfAlgorithm::from_name(value)
        .map(Prf::new)
        .ok_or_else(|| format!("Unknown PRF: {}", value))
}

fn parse_hex(name: &str, value: &str) -> Result<Vec<u8>, String> {
    hex::decode(value.trim_start_matches("0x")).map_err(|e| format!("Invalid hex for {}: {}", name, e))
}

fn run_skeyseed(args: &SkeyseedArgs) -> Result<String, String> {
    let prf = parse_prf(&args.prf)?;
    let ni = parse_hex("ni", &args.ni)?;
    let nr = parse_hex("nr", &args.nr)?;
    let dh = parse_hex("dh", &args.dh)?;

    debug!(prf = prf.algorithm().name(), rekey = args.rekey_sk_d.is_some(), "Computing SKEYSEED");
    let seed = match args.rekey_sk_d {
        Some(ref sk_d) => {
            let sk_d = parse_hex("rekey-sk-d", sk_d)?;
            prf.generate_rekeyed_seed(&sk_d, &ni, &nr, &dh)
        }
        None => prf.generate_seed(&ni, &nr, &dh),
    }
    .map_err(|e| e.to_string())?;

    Ok(hex::encode(seed))
}

fn run_prf_plus(args: &PrfPlusArgs) -> Result<String, String> {
    let prf = parse_prf(&args.prf)?;
    let key = parse_hex("key", &args.key)?;
    let seed = parse_hex("seed", &args.seed)?;

    let output = prf.expand(&key, &seed, args.length).map_err(|e| e.to_string())?;
    Ok(hex::encode(output))
}

fn run_decode_frame(args: &DecodeFrameArgs) -> Result<String, String> {
    let bytes = parse_hex("frame", &args.frame)?;

    let type_data = if args.eap {
        let packet = EapPacket::from_bytes(&bytes).map_err(|e| e.to_string())?;
        if packet.method() != Some(EapType::Ttls) {
            return Err(format!("Not an EAP-TTLS packet (type {:?})", packet.eap_type));
        }
        packet.type_data
    } else {
        bytes
    };

    let frame = TtlsTypeData::decode(&type_data).map_err(|e| e.to_string())?;
    let length = frame
        .message_length()
        .map(|l| l.to_string())
        .unwrap_or_else(|| "-".to_string());

    Ok(format!(
        "flags=0x{:02x} length_included={} more_fragments={} start={} version={} message_length={} acknowledgment={}\ndata={}",
        frame.flags(),
        frame.is_length_included(),
        frame.is_fragmented(),
        frame.is_start(),
        frame.version(),
        length,
        frame.is_acknowledgment(),
        hex::encode(frame.data())
    ))
}

fn run_check_config(path: &str) -> Result<String, String> {
    if !std::path::Path::new(path).exists() {
        EngineConfig::example()
            .to_file(path)
            .map_err(|e| format!("Error creating example config: {}", e))?;
        return Ok(format!("Created example configuration at {}", path));
    }

    let config = EngineConfig::from_file(path).map_err(|e| e.to_string())?;
    Ok(format!(
        "Configuration valid\n  Dispatch timeout: {} ms\n  TTLS fragment size: {} bytes\n  Re-auth cache: {} entries, TTL {} s\n  Log level: {}",
        config.dispatch_timeout_ms,
        config.ttls_fragment_size,
        config.reauth_cache_capacity,
        config.reauth_ttl_secs,
        config.log_level()
    ))
}

fn main() {
    let cli = Cli::parse();

    let log_level = cli
        .config
        .as_deref()
        .and_then(|path| EngineConfig::from_file(path).ok())
        .map(|config| config.log_level().to_string())
        .unwrap_or_else(|| "warn".to_string());

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level)))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let result = match cli.command {
        Command::Skeyseed(ref args) => run_skeyseed(args),
        Command::PrfPlus(ref args) => run_prf_plus(args),
        Command::DecodeFrame(ref args) => run_decode_frame(args),
        Command::CheckConfig { ref path } => run_check_config(path),
    };

    match result {
        Ok(output) => println!("{}", output),
        Err(e) => {
            error!("{}", e);
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_prf() {
        assert_eq!(parse_prf("5").unwrap().algorithm(), PrfAlgorithm::HmacSha256);
        assert_eq!(
            parse_prf("prf_aes128_xcbc").unwrap().algorithm(),
            PrfAlgorithm::Aes128Xcbc
        );
        assert!(parse_prf("PRF_UNKNOWN").is_err());
        assert!(parse_prf("3").is_err());
    }

    #[test]
    fn test_prf_plus_output_length() {
        let args = PrfPlusArgs {
            prf: "PRF_HMAC_SHA1".to_string(),
            key: "0x0102".to_string(),
            seed: "aabb".to_string(),
            length: 50,
        };
        assert_eq!(run_prf_plus(&args).unwrap().len(), 100);
    }

    #[test]
    fn test_decode_frame_from_eap_packet() {
        let args = DecodeFrameArgs {
            frame: "0207000b158000000001ff".to_string(),
            eap: true,
        };
        let output = run_decode_frame(&args).unwrap();
        assert!(output.contains("message_length=1"));
        assert!(output.contains("data=ff"));
    }

    #[test]
    fn test_decode_frame_error() {
        let args = DecodeFrameArgs {
            frame: "8000000005aa".to_string(),
            eap: false,
        };
        assert!(run_decode_frame(&args).unwrap_err().contains("mismatch"));
    }
}
