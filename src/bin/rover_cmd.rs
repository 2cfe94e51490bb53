use clap::{Parser, Subcommand};
use rover_pilot::core::telemetry::PowerReport;
use rover_pilot::utils::logger;
use rover_pilot::utils::validation::Validate;
use rover_pilot::{Rover, RoverConfig, RoverError, SerialTransport};
use serde_json::Value;

#[derive(Parser)]
#[command(name = "rover-cmd")]
#[command(about = "Send a single JSON command to a WAVE ROVER")]
struct Args {
    /// Path to TOML configuration file
    #[arg(short, long)]
    config: Option<String>,

    #[arg(long)]
    port: Option<String>,

    #[arg(long)]
    baud: Option<u32>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: RoverCommand,
}

#[derive(Subcommand)]
enum RoverCommand {
    /// Emergency stop
    Stop,
    /// Set wheel speeds (-255..255)
    Speed {
        #[arg(allow_hyphen_values = true)]
        left: i32,
        #[arg(allow_hyphen_values = true)]
        right: i32,
    },
    /// Set PID gains (only on chassis with speed feedback)
    Pid {
        #[arg(default_value_t = 170)]
        p: i32,
        #[arg(default_value_t = 90)]
        i: i32,
    },
    #[command(subcommand)]
    Oled(OledCommand),
    #[command(subcommand)]
    Servo(ServoCommand),
    #[command(subcommand)]
    BusServo(BusServoCommand),
    #[command(subcommand)]
    Wifi(WifiCommand),
    /// Battery and power supply readout
    Power,
    Imu,
    Encoder,
    DeviceInfo,
    /// Drive the IO5 pin (IR-cut filter or relay)
    IrCut {
        #[arg(action = clap::ArgAction::Set)]
        high: bool,
    },
    #[command(subcommand)]
    SpdRate(SpdRateCommand),
    #[command(subcommand)]
    Nvs(NvsCommand),
    /// Send an arbitrary JSON object
    Raw { json: String },
    /// Print whatever the board has sent since the port was opened
    Read,
}

#[derive(Subcommand)]
enum OledCommand {
    Set { line: u8, text: String },
    Clear,
    Default,
}

#[derive(Subcommand)]
enum ServoCommand {
    Move { position: i32, speed: i32 },
    Mid,
}

#[derive(Subcommand)]
enum BusServoCommand {
    Move {
        id: u8,
        position: i32,
        #[arg(default_value_t = 0)]
        speed: i32,
        #[arg(default_value_t = 0)]
        acceleration: i32,
    },
    Mid { id: u8 },
    Scan { max_id: u8 },
    Info { id: u8 },
    SetId { old: u8, new: u8 },
    TorqueLock {
        id: u8,
        #[arg(action = clap::ArgAction::Set)]
        enabled: bool,
    },
    TorqueLimit { id: u8, limit: i32 },
    Mode { id: u8, mode: u8 },
}

#[derive(Subcommand)]
enum WifiCommand {
    Scan,
    Sta,
    Ap,
    Info,
    Off,
}

#[derive(Subcommand)]
enum SpdRateCommand {
    Set { left: f64, right: f64 },
    Get,
    Save,
}

#[derive(Subcommand)]
enum NvsCommand {
    Space,
    Clear,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    logger::init_tool_logger(args.verbose);

    if let Err(e) = run(args).await {
        eprintln!("❌ {}", e.user_friendly_message());
        eprintln!("💡 {}", e.recovery_suggestion());
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<(), RoverError> {
    let mut config = match &args.config {
        Some(path) => RoverConfig::from_file(path)?,
        None => RoverConfig::default(),
    };
    if let Some(port) = args.port {
        config.serial.port = port;
    }
    if let Some(baud) = args.baud {
        config.serial.baud_rate = baud;
    }
    config.validate()?;

    let transport = SerialTransport::open(
        &config.serial.port,
        config.serial.baud_rate,
        config.read_idle(),
    )?;
    let mut rover = Rover::with_response_delay(transport, config.response_delay());

    let result = execute(&mut rover, args.command).await;
    rover.close().await?;
    if let Some(response) = result? {
        print_response(response);
    }
    Ok(())
}

/// `Ok(None)` means the command printed its own output.
async fn execute(
    rover: &mut Rover<SerialTransport>,
    command: RoverCommand,
) -> Result<Option<Option<Value>>, RoverError> {
    let response = match command {
        RoverCommand::Stop => rover.emergency_stop().await,
        RoverCommand::Speed { left, right } => rover.speed_input(left, right).await,
        RoverCommand::Pid { p, i } => rover.pid_set(p, i).await,
        RoverCommand::Oled(cmd) => match cmd {
            OledCommand::Set { line, text } => rover.oled_set(line, &text).await,
            OledCommand::Clear => rover.oled_clear().await.map(|()| None),
            OledCommand::Default => rover.oled_default().await,
        },
        RoverCommand::Servo(cmd) => match cmd {
            ServoCommand::Move { position, speed } => {
                rover.pwm_servo_control(position, speed).await
            }
            ServoCommand::Mid => rover.pwm_servo_mid().await,
        },
        RoverCommand::BusServo(cmd) => match cmd {
            BusServoCommand::Move {
                id,
                position,
                speed,
                acceleration,
            } => rover.bus_servo_ctrl(id, position, speed, acceleration).await,
            BusServoCommand::Mid { id } => rover.bus_servo_mid(id).await,
            BusServoCommand::Scan { max_id } => rover.bus_servo_scan(max_id).await,
            BusServoCommand::Info { id } => rover.bus_servo_info(id).await,
            BusServoCommand::SetId { old, new } => rover.bus_servo_id_set(old, new).await,
            BusServoCommand::TorqueLock { id, enabled } => {
                rover.bus_servo_torque_lock(id, enabled).await
            }
            BusServoCommand::TorqueLimit { id, limit } => {
                rover.bus_servo_torque_limit(id, limit).await
            }
            BusServoCommand::Mode { id, mode } => rover.bus_servo_mode(id, mode).await,
        },
        RoverCommand::Wifi(cmd) => match cmd {
            WifiCommand::Scan => rover.wifi_scan().await,
            WifiCommand::Sta => rover.wifi_try_sta().await,
            WifiCommand::Ap => rover.wifi_ap_default().await,
            WifiCommand::Info => rover.wifi_info().await,
            WifiCommand::Off => rover.wifi_off().await,
        },
        RoverCommand::Power => {
            let report = PowerReport::new(rover.ina219_info().await?);
            println!("Battery:        {:5.1}%", report.battery_percentage);
            println!("Bus Voltage:    {:6.3} V", report.reading.bus_v);
            println!("Load Voltage:   {:6.3} V", report.reading.load_v);
            println!("Shunt Voltage:  {:9.6} mV", report.reading.shunt_mv);
            println!("Current:        {:9.3} mA", report.reading.current_ma);
            println!("Power:          {:9.3} mW", report.reading.power_mw);
            println!("State:          {}", report.state);
            return Ok(None);
        }
        RoverCommand::Imu => rover.imu_info().await,
        RoverCommand::Encoder => rover.encoder_info().await,
        RoverCommand::DeviceInfo => rover.device_info().await,
        RoverCommand::IrCut { high } => rover.io_ir_cut(high).await,
        RoverCommand::SpdRate(cmd) => match cmd {
            SpdRateCommand::Set { left, right } => rover.set_spd_rate(left, right).await,
            SpdRateCommand::Get => rover.get_spd_rate().await,
            SpdRateCommand::Save => rover.spd_rate_save().await,
        },
        RoverCommand::Nvs(cmd) => match cmd {
            NvsCommand::Space => rover.get_nvs_space().await,
            NvsCommand::Clear => rover.nvs_clear().await,
        },
        RoverCommand::Raw { json } => {
            let value: Value = serde_json::from_str(&json)?;
            rover.send_raw(&value).await
        }
        RoverCommand::Read => {
            println!("{}", rover.read_data().await?);
            return Ok(None);
        }
    };
    response.map(Some)
}

fn print_response(response: Option<Value>) {
    match response {
        Some(value) => match serde_json::to_string_pretty(&value) {
            Ok(text) => println!("{}", text),
            Err(_) => println!("{}", value),
        },
        None => println!("(no response)"),
    }
}
