//! CLI tool for the virtual SMC key store
//!
//! Builds an in-process store, attaches mock-backed GPU sensor back-ends,
//! and drives every query through the user-client protocol, so the output
//! reflects exactly what a user-space SMC caller would see.

#[cfg(feature = "cli")]
use clap::{Parser, Subcommand};

#[cfg(feature = "cli")]
#[derive(Parser)]
#[command(name = "vsmc")]
#[command(about = "Virtual SMC: software-emulated SMC key store with GPU sensor back-ends", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (TOML)
    #[arg(short, long, global = true)]
    config: Option<std::path::PathBuf>,

    /// Output format (json or text)
    #[arg(short, long, default_value = "text", global = true)]
    format: String,

    /// Open the session without administrator privilege
    #[arg(long, global = true)]
    unprivileged: bool,
}

#[cfg(feature = "cli")]
#[derive(Subcommand)]
enum Commands {
    /// Enumerate all keys (name, type, size, value)
    Keys,
    /// Read a key's value bytes
    Read {
        /// 4-character key name, e.g. TG0D
        key: String,
    },
    /// Show a key's declared size and type
    Info {
        /// 4-character key name
        key: String,
    },
    /// Write value bytes to a key (creates it if missing)
    Write {
        /// 4-character key name
        key: String,
        /// Payload as hex, e.g. 4180
        payload: String,
        /// 4-character type tag for key creation
        #[arg(short = 't', long = "type")]
        data_type: Option<String>,
    },
    /// Poll sensor back-ends and print readings as they refresh
    Monitor {
        /// Number of refresh cycles (0 = run until interrupted)
        #[arg(short = 'n', long, default_value = "0")]
        count: u32,
    },
}

#[cfg(feature = "cli")]
fn main() -> Result<(), Box<dyn std::error::Error>> {
    use serde_json::json;
    use std::sync::Arc;
    use vsmc::protocol::{
        SmcKeyData, KERNEL_INDEX_SMC, SMC_CMD_READ_BYTES, SMC_CMD_READ_INDEX,
        SMC_CMD_READ_KEYINFO, SMC_CMD_WRITE_BYTES,
    };
    use vsmc::sensors::{MockRegisters, SensorSource};
    use vsmc::{
        Config, FourCc, KeyStore, NouveauSensors, Privilege, RadeonFamily, RadeonSensors,
        UserClient,
    };

    let cli = Cli::parse();

    env_logger::init();

    let config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };

    // Demo provider: sensor back-ends over pre-loaded mock register blocks.
    // Real register mapping lives with the PCI layer, outside this crate.
    let store = Arc::new(KeyStore::new());
    let mut backends: Vec<Box<dyn SensorSource>> = Vec::new();
    if config.sensors.nouveau {
        // GK104, reporting 65 C.
        let regs = MockRegisters::with_values(&[(0x000000, 0xe4 << 20), (0x020400, 65)]);
        backends.push(Box::new(NouveauSensors::new(regs, 0)?));
    }
    if config.sensors.radeon {
        // Evergreen-class card reporting 58 C.
        let regs = MockRegisters::with_values(&[(0x740, 58 << 16)]);
        backends.push(Box::new(RadeonSensors::new(regs, 1, RadeonFamily::Evergreen)));
    }
    for backend in &mut backends {
        backend.register(&store)?;
    }

    let privilege = if cli.unprivileged {
        Privilege::Standard
    } else {
        Privilege::Administrator
    };
    let client = UserClient::open(store.clone(), privilege);

    let call = |input: &SmcKeyData| -> Result<SmcKeyData, Box<dyn std::error::Error>> {
        let mut output = SmcKeyData::default();
        let status = client.external_method(KERNEL_INDEX_SMC, input, &mut output);
        if status != 0 {
            return Err(format!("SMC call failed with status {:#010x}", status).into());
        }
        Ok(output)
    };

    match &cli.command {
        Commands::Keys => {
            let mut rows = Vec::new();
            for index in 0.. {
                let mut input = SmcKeyData::default();
                input.data8 = SMC_CMD_READ_INDEX;
                input.data32 = index;
                let Ok(resolved) = call(&input) else { break };
                let name = FourCc::unpack(resolved.key)?;

                let mut info_req = SmcKeyData::default();
                info_req.data8 = SMC_CMD_READ_KEYINFO;
                info_req.key = name.pack();
                let info = call(&info_req)?;

                let mut read_req = SmcKeyData::default();
                read_req.data8 = SMC_CMD_READ_BYTES;
                read_req.key = name.pack();
                let value = call(&read_req)?;

                let size = info.key_info.data_size as usize;
                rows.push((
                    name,
                    FourCc::unpack(info.key_info.data_type)?,
                    size,
                    value.bytes[..size].to_vec(),
                ));
            }

            if cli.format == "json" {
                let entries: Vec<_> = rows
                    .iter()
                    .map(|(name, ty, size, value)| {
                        json!({
                            "key": name.to_string(),
                            "type": ty.to_string(),
                            "size": size,
                            "value": to_hex(value),
                        })
                    })
                    .collect();
                println!("{}", serde_json::to_string_pretty(&entries)?);
            } else {
                println!("{:<6}{:<6}{:<6}value", "key", "type", "size");
                for (name, ty, size, value) in rows {
                    println!("{:<6}{:<6}{:<6}{}", name, ty, size, to_hex(&value));
                }
            }
        }

        Commands::Read { key } => {
            let name: FourCc = key.parse()?;
            let mut info_req = SmcKeyData::default();
            info_req.data8 = SMC_CMD_READ_KEYINFO;
            info_req.key = name.pack();
            let info = call(&info_req)?;

            let mut read_req = SmcKeyData::default();
            read_req.data8 = SMC_CMD_READ_BYTES;
            read_req.key = name.pack();
            let value = call(&read_req)?;
            let size = info.key_info.data_size as usize;

            if cli.format == "json" {
                println!(
                    "{}",
                    json!({ "key": key, "value": to_hex(&value.bytes[..size]) })
                );
            } else {
                println!("{} = {}", key, to_hex(&value.bytes[..size]));
            }
        }

        Commands::Info { key } => {
            let name: FourCc = key.parse()?;
            let mut input = SmcKeyData::default();
            input.data8 = SMC_CMD_READ_KEYINFO;
            input.key = name.pack();
            let info = call(&input)?;
            let ty = FourCc::unpack(info.key_info.data_type)?;
            if cli.format == "json" {
                println!(
                    "{}",
                    json!({ "key": key, "type": ty.to_string(), "size": info.key_info.data_size })
                );
            } else {
                println!("{}: type {} size {}", key, ty, info.key_info.data_size);
            }
        }

        Commands::Write {
            key,
            payload,
            data_type,
        } => {
            let name: FourCc = key.parse()?;
            let payload = from_hex(payload)?;
            let mut input = SmcKeyData::default();
            input.data8 = SMC_CMD_WRITE_BYTES;
            input.key = name.pack();
            input.key_info.data_size = payload.len() as u32;
            if let Some(ty) = data_type {
                input.key_info.data_type = ty.parse::<FourCc>()?.pack();
            }
            if payload.len() > input.bytes.len() {
                return Err(format!("payload longer than {} bytes", input.bytes.len()).into());
            }
            input.bytes[..payload.len()].copy_from_slice(&payload);
            call(&input)?;
            println!("wrote {} bytes to {}", payload.len(), key);
        }

        Commands::Monitor { count } => {
            let interval =
                std::time::Duration::from_millis(u64::from(config.polling.update_interval_ms));
            let mut cycles = 0;
            loop {
                for backend in &mut backends {
                    backend.update(&store)?;
                }
                let table = store.lock();
                let readings: Vec<String> = table
                    .iter()
                    .map(|key| format!("{}={}", key.name(), to_hex(key.value())))
                    .collect();
                drop(table);
                println!("{}", readings.join(" "));

                cycles += 1;
                if *count != 0 && cycles >= *count {
                    break;
                }
                std::thread::sleep(interval);
            }
        }
    }

    Ok(())
}

#[cfg(feature = "cli")]
fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

#[cfg(feature = "cli")]
fn from_hex(s: &str) -> Result<Vec<u8>, Box<dyn std::error::Error>> {
    if s.len() % 2 != 0 {
        return Err("hex payload must have an even number of digits".into());
    }
    (0..s.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&s[i..i + 2], 16).map_err(Into::into))
        .collect()
}

#[cfg(not(feature = "cli"))]
fn main() {
    eprintln!("vsmc-cli requires the 'cli' feature");
    std::process::exit(1);
}
