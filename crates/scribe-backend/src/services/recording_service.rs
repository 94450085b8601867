//! Wires audio capture, the decode worker, and the scheduler together for
//! one recording session (§4.5-§4.7).

use std::time::{Duration, Instant};

use cpal::traits::StreamTrait;
use log::info;
use ringbuf_blocking::{
    BlockingHeapRb,
    traits::{Consumer, Producer, Split},
};
use scribe_audio::resampler::{AudioResampler, StreamingResampler};
use scribe_bridge::{CoreEvent, config::PipelineConfig, notification::NotificationType};
use scribe_speech::{
    decoder::Decoder,
    filler::strip_filler_words,
    scheduler::{Scheduler, SchedulerConfig, window_samples},
    whisper::WhisperDecoder,
};

use crate::state::ActiveRecording;

/// A wall-clock limit on a single window decode; past this, the result is
/// dropped rather than applied to the stabilizer (§4.5).
const DECODE_STALL_LIMIT: Duration = Duration::from_millis(4_000);

/// Signals sent from the command-handling side to the decode worker thread.
pub enum RecordingControl {
    /// Stop capture and run the finalization path.
    Stop,
    /// Discard everything, no finalization.
    Cancel,
}

pub async fn handle_start_recording(context: super::AppContextHandle, config: PipelineConfig) {
    let config = config.sanitized();

    if context.state.read().await.active_recording.is_some() {
        context
            .send_notification(NotificationType::Warning, "a recording is already in progress")
            .await;
        return;
    }

    let Some(active_model_path) = config.active_model_path.clone() else {
        context
            .send_notification(NotificationType::Error, "no speech model is configured")
            .await;
        return;
    };
    if !active_model_path.exists() {
        context
            .send_notification(NotificationType::Error, "the configured speech model is missing")
            .await;
        return;
    }

    let active_device = {
        let state = context.state.read().await;
        (*state.active_audio_device).clone()
    };
    let Some(active_device) = active_device else {
        context
            .send_notification(NotificationType::Error, "no input device is selected")
            .await;
        return;
    };

    info!("Active device is: {active_device}, active model: {active_model_path:?}");

    let (sample_rate, channels) = active_device
        .sample_rate_and_channels()
        .expect("failed to get device's original sample rate and channels");
    let target_buffer_size = active_device
        .target_buffer_size(config.sample_rate)
        .expect("failed to get target buffer size for the device");

    info!(
        "The target device's original sample rate is {} Hz and it has {} channel(-s). Target buffer size is {}.",
        sample_rate, channels, target_buffer_size,
    );

    let mut resampler =
        StreamingResampler::<f32>::new(sample_rate, config.sample_rate, target_buffer_size)
            .expect("failed to create a resampler");
    let mut samples_accumulator = Vec::with_capacity(target_buffer_size as usize);

    let inner_buffer = BlockingHeapRb::<f32>::new((config.sample_rate * 3) as usize);
    let (mut producer, mut consumer) = inner_buffer.split();

    let (control_tx, control_rx) = std::sync::mpsc::channel::<RecordingControl>();

    let worker_context = context.clone();
    let worker_config = config.clone();
    tokio::task::spawn_blocking(move || {
        let mut decoder =
            WhisperDecoder::new(window_samples(worker_config.max_buffer_ms, worker_config.sample_rate));
        if let Err(error) = decoder.load_model(
            active_model_path_str(&worker_config).as_str(),
            &worker_config.language,
        ) {
            worker_context.send_blocking(CoreEvent::Notification(
                scribe_bridge::notification::NotificationMessage {
                    notification_type: NotificationType::Error,
                    message: format!("failed to load speech model: {error}"),
                },
            ));
            return;
        }

        let mut scheduler = Scheduler::new(SchedulerConfig {
            sample_rate: worker_config.sample_rate,
            window_ms: worker_config.window_ms,
            commit_margin_ms: worker_config.commit_margin_ms,
            silence_ms: worker_config.silence_ms,
            max_buffer_ms: worker_config.max_buffer_ms,
            max_prompt_chars: worker_config.max_prompt_chars,
            min_token_probability: worker_config.min_token_probability,
            energy_threshold: worker_config.energy_threshold,
        });

        let tick_interval = Duration::from_millis(worker_config.tick_ms);
        let mut last_tick = Instant::now();
        let mut samples_buffer = vec![0.0f32; 4096];
        let session_limit = Duration::from_secs(worker_config.max_session_minutes as u64 * 60);
        let session_start = Instant::now();
        let mut max_duration_notified = false;

        loop {
            match control_rx.try_recv() {
                Ok(RecordingControl::Stop) => {
                    run_finalization(&worker_context, &mut scheduler, &mut decoder, &worker_config);
                    decoder.unload_model();
                    return;
                }
                Ok(RecordingControl::Cancel) => {
                    scheduler.cancel();
                    decoder.unload_model();
                    return;
                }
                Err(std::sync::mpsc::TryRecvError::Empty) => {}
                Err(std::sync::mpsc::TryRecvError::Disconnected) => {
                    decoder.unload_model();
                    return;
                }
            }

            let len = consumer.pop_slice(&mut samples_buffer);
            if len > 0 {
                scheduler.push_audio(&samples_buffer[..len]);
            }

            if !max_duration_notified && session_start.elapsed() >= session_limit {
                worker_context.send_blocking(CoreEvent::MaxDurationReached);
                max_duration_notified = true;
            }

            if last_tick.elapsed() < tick_interval {
                if len == 0 {
                    std::thread::sleep(Duration::from_millis(5));
                }
                continue;
            }
            last_tick = Instant::now();

            let (events, request) = scheduler.tick();
            for event in events {
                worker_context.send_blocking(event);
            }

            let mut pending = request;
            while let Some(decode_request) = pending {
                let deadline = Instant::now();
                let result = decoder.decode_window(
                    &decode_request.accumulated_pcm,
                    decode_request.accumulated_start_abs_ms,
                    decode_request.prompt.as_deref(),
                );

                let (events, follow_up) = if deadline.elapsed() > DECODE_STALL_LIMIT {
                    (Vec::new(), scheduler.on_decode_stalled())
                } else {
                    scheduler.complete_decode(result, decode_request.accumulated_end_abs_ms)
                };

                for event in events {
                    worker_context.send_blocking(event);
                }
                pending = follow_up;
            }
        }
    });

    let mut resampled_callback = move |written_data: &[f32]| {
        producer.push_slice(written_data);
    };

    let audio_stream = scribe_audio::device::open_cpal_input_stream(
        &active_device,
        config.sample_rate,
        move |data: &[f32]| {
            if data.len() != (target_buffer_size as usize * channels as usize) {
                log::error!(
                    "Received an unexpected buffer from CPAL with the size of {} samples.",
                    data.len()
                );
                return;
            }

            let received_frames = data.len() / channels as usize;
            samples_accumulator.resize(received_frames, 0.0);
            scribe_audio::mixer::mix_stereo_to_mono(&mut samples_accumulator[..received_frames], data);

            if let Err(error) = resampler
                .process_callback(&samples_accumulator[..received_frames], &mut resampled_callback)
            {
                log::error!("Resampler caught an error: {error:?}");
            }
        },
        |error| log::error!("An error occurred while processing the input stream data: {error}"),
    )
    .expect("failed to open an input stream for the device");

    audio_stream.play().expect("failed to play audio stream");

    {
        let mut state = context.state.write().await;
        state.active_recording = Some(ActiveRecording {
            stream: audio_stream,
            control: control_tx,
        });
    }

    info!("Started capturing and transcribing...");
}

pub async fn handle_stop_recording(context: super::AppContextHandle) {
    let recording = context.state.write().await.active_recording.take();
    match recording {
        Some(recording) => {
            drop(recording.stream);
            let _ = recording.control.send(RecordingControl::Stop);
        }
        None => log::warn!("stop_recording received with no active recording"),
    }
}

pub async fn handle_cancel_recording(context: super::AppContextHandle) {
    let recording = context.state.write().await.active_recording.take();
    match recording {
        Some(recording) => {
            drop(recording.stream);
            let _ = recording.control.send(RecordingControl::Cancel);
        }
        None => log::warn!("cancel_recording received with no active recording"),
    }
}

/// Runs the finalization path (§4.7): a one-shot full re-decode replaces
/// committed text when non-empty, the optional filler-word filter is
/// applied, and the final text is emitted exactly once.
fn run_finalization(
    context: &super::AppContextHandle,
    scheduler: &mut Scheduler,
    decoder: &mut WhisperDecoder,
    config: &PipelineConfig,
) {
    let full_decode_text = decoder.decode_full(scheduler.full_audio()).ok();
    let state = scheduler.finalize(full_decode_text);
    let final_text = if config.filler_words.is_empty() {
        state.raw_committed
    } else {
        strip_filler_words(&state.raw_committed, &config.filler_words)
    };
    context.send_blocking(CoreEvent::FinalText(final_text));
}

fn active_model_path_str(config: &PipelineConfig) -> String {
    config
        .active_model_path
        .as_ref()
        .and_then(|path| path.to_str())
        .expect("active model path must be valid UTF-8")
        .to_string()
}
