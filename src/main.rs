use clap::Parser;
use rover_pilot::adapters::list_devices;
use rover_pilot::core::InputSource;
use rover_pilot::utils::error::ErrorSeverity;
use rover_pilot::utils::{logger, validation::Validate};
use rover_pilot::{
    CliConfig, DriveController, DriveSession, EvdevInput, Rover, RoverConfig, RoverError,
    SerialTransport,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = CliConfig::parse();

    let config = match cli.load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ Failed to load configuration: {}", e);
            eprintln!("💡 {}", e.recovery_suggestion());
            std::process::exit(1);
        }
    };

    if cli.list_devices {
        print_devices();
        return Ok(());
    }

    if cli.print_events || cli.dry_run {
        logger::init_tool_logger(cli.verbose);
    } else if let Err(e) = logger::init_cli_logger(cli.verbose, &config.logging) {
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(1);
    }

    tracing::info!("Starting rover-pilot");
    if cli.verbose {
        tracing::debug!("CLI config: {:?}", cli);
    }

    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(1);
    }

    if cli.dry_run {
        display_config_summary(&config);
        return Ok(());
    }

    let result = if cli.print_events {
        print_events(&config).await
    } else {
        drive(&config).await
    };

    if let Err(e) = result {
        tracing::error!(
            "❌ rover-pilot failed: {} (Category: {:?}, Severity: {:?})",
            e,
            e.category(),
            e.severity()
        );
        tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

        eprintln!("❌ {}", e.user_friendly_message());
        eprintln!("💡 {}", e.recovery_suggestion());

        let exit_code = match e.severity() {
            ErrorSeverity::Low => 0,
            ErrorSeverity::Medium => 2,
            ErrorSeverity::High => 1,
            ErrorSeverity::Critical => 3,
        };

        if exit_code > 0 {
            std::process::exit(exit_code);
        }
    }

    Ok(())
}

async fn drive(config: &RoverConfig) -> Result<(), RoverError> {
    let input = EvdevInput::open(config.input.device.as_deref(), config.axis_scale())?;
    let transport = SerialTransport::open(
        &config.serial.port,
        config.serial.baud_rate,
        config.read_idle(),
    )?;

    let rover = Rover::with_response_delay(transport, config.response_delay());
    let controller = DriveController::new(config.drive_settings());
    let session = DriveSession::new(input, rover, controller, config.session_options());

    println!("🎮 Driving. B = emergency stop, Start = re-arm, LB/RB = gear, Back = battery, Guide = quit");

    let summary = session
        .run(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::warn!("Cannot listen for Ctrl-C: {}", e);
                std::future::pending::<()>().await;
            }
        })
        .await?;

    println!(
        "✅ Session ended ({:?}): {} events, {} commands sent, {} drive commands, {} emergency stops, {} power reports",
        summary.reason,
        summary.events,
        summary.commands_sent,
        summary.drive_commands,
        summary.emergency_stops,
        summary.power_reports
    );
    Ok(())
}

async fn print_events(config: &RoverConfig) -> Result<(), RoverError> {
    let mut input = EvdevInput::open(config.input.device.as_deref(), config.axis_scale())?;
    println!(
        "🎮 Reading {} ({}), Ctrl-C to stop",
        input.path().display(),
        input.name()
    );

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            _ = &mut ctrl_c => break,
            event = input.next_event() => match event? {
                Some(event) => println!("{}", event),
                None => {
                    println!("Input device closed");
                    break;
                }
            },
        }
    }
    Ok(())
}

fn print_devices() {
    let devices = list_devices();
    if devices.is_empty() {
        println!("No input devices found (are you in the 'input' group?)");
        return;
    }
    for device in devices {
        println!("{}\t{}\t{}", device.path.display(), device.name, device.phys);
    }
}

fn display_config_summary(config: &RoverConfig) {
    println!("📋 Configuration Summary:");
    println!(
        "  Serial: {} @ {} baud (response delay {}ms)",
        config.serial.port, config.serial.baud_rate, config.serial.response_delay_ms
    );
    println!(
        "  Input: {}",
        config
            .input
            .device
            .as_deref()
            .unwrap_or("first gamepad found")
    );
    println!(
        "  Axis scale: joystick ±{}, trigger {}; deadzone {}%",
        config.input.joystick_max, config.input.trigger_max, config.input.deadzone
    );
    println!(
        "  Drive: {:?}, max speed {}, gears {:?} (start at {})",
        config.drive.mode,
        config.drive.max_speed,
        config.drive.gears,
        config.drive.initial_gear + 1
    );
    if config.telemetry.enabled {
        println!(
            "  Telemetry: every {}s{}",
            config.telemetry.interval_seconds,
            config
                .telemetry
                .csv_path
                .as_ref()
                .map(|p| format!(", CSV to {}", p))
                .unwrap_or_default()
        );
    } else {
        println!("  Telemetry: disabled");
    }
    println!(
        "  Log file: {}",
        config.logging.log_file.as_deref().unwrap_or("none")
    );
    println!();
    println!("✅ Dry run complete, nothing was sent to the rover.");
}
