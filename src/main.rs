//! Headless driver for the transcription core: prompts for an input
//! device, starts a recording, and prints committed/speculative/final text
//! to stdout. Stands in for a GUI collaborator, which is out of scope.

use std::io::Write;

use scribe_bridge::{BridgeChannels, CoreCommand, CoreEvent};

fn prompt_select_capture_device(host: &cpal::Host) -> scribe_audio::device::HostInputDevice {
    let devices = scribe_audio::device::list_host_input_devices(host)
        .expect("failed to list host input devices");
    for (index, device) in devices.iter().enumerate() {
        println!("[SELECT] {}. Input device: {device}", index + 1);
    }

    print!("[INFO] Select the capture device to use: ");
    std::io::stdout().flush().unwrap();

    let mut line = String::new();
    std::io::stdin()
        .read_line(&mut line)
        .expect("failed to read line");
    let index = line.trim().parse::<usize>().expect("invalid input") - 1;

    match devices.get(index) {
        Some(device) => device.clone(),
        None => panic!("no device found at index {}", index + 1),
    }
}

fn main() {
    simple_logger::SimpleLogger::new()
        .with_level(log::LevelFilter::Info)
        .without_timestamps()
        .init()
        .expect("failed to create logger instance");
    whisper_rs::install_logging_hooks();

    let host = cpal::default_host();
    let device = prompt_select_capture_device(&host);
    println!("[INFO] Using capture device: {device}");

    let channels = BridgeChannels::default();
    scribe_backend::run(channels.core_rx, channels.core_tx);

    channels
        .external_tx
        .blocking_send(CoreCommand::SelectAudioDevice(device.id.to_string()))
        .expect("failed to send device selection");

    channels
        .external_tx
        .blocking_send(CoreCommand::ConfigurationRequest)
        .expect("failed to send configuration request");

    let mut external_rx = channels.external_rx;
    let mut config = loop {
        match external_rx
            .blocking_recv()
            .expect("channel closed before configuration response arrived")
        {
            CoreEvent::ConfigurationResponse(config) => break config,
            CoreEvent::Notification(message) => println!("[NOTICE] {}", message.message),
            _ => {}
        }
    };
    config.selected_device_id = Some(device.id.to_string());

    if config.active_model_path.is_none() {
        panic!(
            "no speech model is configured; set `active_model_path` in the persisted configuration before starting a recording"
        );
    }

    channels
        .external_tx
        .blocking_send(CoreCommand::StartRecording(config))
        .expect("failed to send start command");

    println!("[INFO] Recording started. Press Enter to stop, Ctrl+C to cancel.");

    let stop_tx = channels.external_tx.clone();
    std::thread::spawn(move || {
        let mut line = String::new();
        let _ = std::io::stdin().read_line(&mut line);
        let _ = stop_tx.blocking_send(CoreCommand::StopRecording);
    });

    while let Some(event) = external_rx.blocking_recv() {
        match event {
            CoreEvent::CommittedTextChanged(text) => println!("[COMMITTED] {text}"),
            CoreEvent::SpeculativeTextChanged(text) => println!("[SPECULATIVE] {text}"),
            CoreEvent::AudioLevel(_) => {}
            CoreEvent::FinalText(text) => {
                println!("[FINAL] {text}");
                break;
            }
            CoreEvent::MaxDurationReached => println!("[INFO] maximum session length reached"),
            CoreEvent::DeviceChanged => println!("[WARN] input device changed mid-recording"),
            CoreEvent::Notification(message) => println!("[NOTICE] {}", message.message),
            CoreEvent::ConfigurationResponse(_) | CoreEvent::AudioDevicesListResponse(_) => {}
        }
    }
}
