use tempovox_audio::DeviceManager;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let manager = DeviceManager::new()?;

    println!("Input devices (host: {:?}):", manager.host_id());
    let devices = manager.enumerate_devices();
    if devices.is_empty() {
        println!("  (none found)");
        return Ok(());
    }
    for device in &devices {
        let marker = if device.is_default { "  * " } else { "  - " };
        println!("{marker}{}", device.name);
    }

    println!();
    println!("Capture tries these in order when no device is named:");
    for name in manager.candidate_device_names() {
        println!("  {name}");
    }
    Ok(())
}
