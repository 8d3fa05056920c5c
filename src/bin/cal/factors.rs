use labtool::{Calibration, CalibrationRaw};

fn main() -> labtool::Result<()> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    let calibration = match std::env::args_os().nth(1) {
        Some(path) => {
            let bytes = std::fs::read(&path)?;
            log::info!("read {} bytes from {:?}", bytes.len(), path);
            Calibration::from_bytes(&bytes)?
        }
        None => {
            log::info!("no calibration record given, using the factory default ({} bytes)",
                CalibrationRaw::SIZE);
            Calibration::factory()
        }
    };

    calibration.log_raw();
    calibration.log_factors();

    let codes = [0, 256, 512, 768, 1023];
    for channel in 0..2 {
        let volts = calibration.codes_to_volts(channel, 0, &codes);
        println!("A{} at 20 mV/div: {:?} -> {:.4?} V", channel, codes, volts);
    }
    Ok(())
}
