use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use global_hotkey::hotkey::HotKey;
use global_hotkey::{GlobalHotKeyEvent, GlobalHotKeyManager, HotKeyState};
use parking_lot::RwLock;
use tao::event::{Event, StartCause};
use tao::event_loop::{ControlFlow, EventLoop, EventLoopBuilder, EventLoopProxy};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tray_icon::menu::{AboutMetadataBuilder, Menu, MenuEvent, MenuItem, PredefinedMenuItem};
use tray_icon::{TrayIcon, TrayIconBuilder};
use voxpaste::event::VoxEvent;
use voxpaste::hotkey::ConfigExt;
use voxpaste::icon::MicIcon;
use voxpaste::notify::NotificationLayer;
use voxpaste::paste::{InsertOptions, Inserter};
use voxpaste::process::{AudioPipeline, SubmitResult};
use voxpaste::transcriber::ConfiguredTranscriber;
use voxpaste::{
    APP_NAME_PRETTY, AudioEvent, ConfigManager, DEFAULT_LOG_LEVEL, HotkeyAction, MicState,
    Recorder, RecordingHandle, VERSION,
};
use voxpaste_core::resolve_api_key;

/// How often the hotkey and menu channels are drained.
const POLL_INTERVAL: Duration = Duration::from_millis(30);

fn main() -> Result<()> {
    // Initialize the logger
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("VOXPASTE_LOG")
                .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_LEVEL)),
        )
        .finish()
        .with(NotificationLayer::new())
        .init();

    // Load config
    let config_manager = ConfigManager::new()?;
    let config = Arc::new(RwLock::new(config_manager.load()?));
    // save back the config to create the file if it doesn't exist
    config_manager.save(&config.read())?;
    let config_dir = config_manager.config_dir()?.to_path_buf();

    if let Err(e) = resolve_api_key(&config.read(), &config_dir) {
        warn!(
            "{}. Transcriptions will not work until a key is available.",
            e
        );
    }

    // Set up hotkey
    let hotkey_manager = GlobalHotKeyManager::new().context("Failed to create hotkey manager")?;
    let mut hotkey = config.read().hotkey_binding();
    hotkey_manager
        .register(hotkey)
        .context("Failed to register hotkey")?;
    info!(hotkey = %config.read().hotkey(), "Hotkey registered");

    // Set up recorder
    let recorder = Recorder::new();
    let mut active_recording: Option<RecordingHandle> = None;
    let mut mic_state = MicState::Idle;

    // Set up keyboard and clipboard interaction
    let mut inserter = Inserter::new()?;

    // Create the tray menu
    let tray_menu = Menu::new();
    let icon_quit = MenuItem::new("Quit", true, None);
    let icon_copy_config = MenuItem::new("Copy config path", true, None);
    let icon_reload_config = MenuItem::new("Reload config", true, None);
    tray_menu.append_items(&[
        // the name of the app
        &MenuItem::new(APP_NAME_PRETTY, false, None),
        &PredefinedMenuItem::separator(),
        &PredefinedMenuItem::about(
            None,
            Some(
                AboutMetadataBuilder::new()
                    .version(Some(VERSION.to_owned()))
                    .build(),
            ),
        ),
        &icon_copy_config,
        &icon_reload_config,
        &PredefinedMenuItem::separator(),
        &icon_quit,
    ])?;

    // Set up the event loop
    let mut icon_tray: Option<TrayIcon> = None;

    let menu_channel = MenuEvent::receiver();
    let hotkey_channel = GlobalHotKeyEvent::receiver();

    let event_loop: EventLoop<VoxEvent> = EventLoopBuilder::with_user_event().build();
    let event_sender = event_loop.create_proxy();

    // Set up processor for handling audio data async operations
    let transcriber = Arc::new(ConfiguredTranscriber::new(config.clone(), config_dir));
    let audio_pipeline = AudioPipeline::new(config.clone(), transcriber, event_sender.clone())?;

    event_loop.run(move |event, _, control_flow| {
        *control_flow = ControlFlow::WaitUntil(Instant::now() + POLL_INTERVAL);

        if let Event::NewEvents(StartCause::Init) = event {
            // We create the icon once the event loop is actually running
            // to prevent issues like https://github.com/tauri-apps/tray-icon/issues/90
            let mut builder = TrayIconBuilder::new()
                .with_menu(Box::new(tray_menu.clone()))
                .with_tooltip(format!("{} - speech to text", APP_NAME_PRETTY));
            if let Some(icon) = MicState::Idle.icon() {
                builder = builder.with_icon(icon);
            }
            match builder.build() {
                Ok(tray) => {
                    icon_tray.replace(tray);
                }
                Err(e) => error!("Failed to create tray icon: {}", e),
            }

            // We have to request a redraw here to have the icon actually show up.
            // Tao only exposes a redraw method on the Window so we use core-foundation directly.
            #[cfg(target_os = "macos")]
            unsafe {
                use core_foundation::runloop::{CFRunLoopGetMain, CFRunLoopWakeUp};

                let rl = CFRunLoopGetMain();
                CFRunLoopWakeUp(rl);
            }

            info!("{} ready", APP_NAME_PRETTY);
        }

        while let Ok(event) = menu_channel.try_recv() {
            if event.id() == icon_quit.id() {
                // Finish any open recording so the stream is released.
                drop(active_recording.take());
                icon_tray.take();
                *control_flow = ControlFlow::Exit;
                return;
            } else if event.id() == icon_copy_config.id() {
                let path = config_manager.config_path().to_string_lossy().into_owned();
                if let Err(e) = inserter.copy(path) {
                    error!("Failed to copy config path to clipboard: {}", e);
                }
            } else if event.id() == icon_reload_config.id() {
                reload_config(&config_manager, &config, &hotkey_manager, &mut hotkey);
            }
        }

        // Handle user provided events
        if let Event::UserEvent(event) = event {
            match event {
                VoxEvent::StateChanged(state) => {
                    // A late signal from the audio thread must not revive a
                    // finished recording.
                    let stale = state == MicState::Active && mic_state != MicState::Activating;
                    if !stale {
                        set_state(&mut mic_state, state, icon_tray.as_ref());
                    }
                }
                VoxEvent::TranscriptReady(text) => {
                    // Go back to idle before pasting so the next press can
                    // start a new recording.
                    set_state(&mut mic_state, MicState::Idle, icon_tray.as_ref());
                    let options = InsertOptions::from_config(&config.read());
                    inserter.insert(&text, options);
                }
                VoxEvent::TranscriptionFailed(message) => {
                    info!(reason = %message, "Nothing to insert");
                }
            };
        }

        // Handle hotkey events
        while let Ok(event) = hotkey_channel.try_recv() {
            if event.id() != hotkey.id() || event.state() != HotKeyState::Pressed {
                continue;
            }
            let next = match mic_state.on_hotkey() {
                HotkeyAction::StartRecording => {
                    start_recording(&recorder, &mut active_recording, &event_sender)
                }
                HotkeyAction::StopRecording => {
                    stop_recording(&mut active_recording, &audio_pipeline)
                }
                HotkeyAction::Ignore => {
                    info!("Transcription in progress, ignoring hotkey");
                    mic_state
                }
            };
            set_state(&mut mic_state, next, icon_tray.as_ref());
        }
    });
}

fn set_state(current: &mut MicState, next: MicState, tray: Option<&TrayIcon>) {
    if *current == next {
        return;
    }
    info!(from = ?current, to = ?next, "State changed");
    *current = next;
    if let Some(tray) = tray {
        if let Err(e) = tray.set_icon(next.icon()) {
            warn!("Failed to update tray icon: {}", e);
        }
    }
}

fn start_recording(
    recorder: &Recorder,
    active_recording: &mut Option<RecordingHandle>,
    event_sender: &EventLoopProxy<VoxEvent>,
) -> MicState {
    let sender = event_sender.clone();
    let on_event = Box::new(move |event: AudioEvent| match event {
        AudioEvent::StateChanged(state) => {
            sender.send_event(VoxEvent::StateChanged(state)).ok();
        }
    });

    match recorder.start_recording(on_event) {
        Ok(handle) => {
            info!("Recording started");
            *active_recording = Some(handle);
            MicState::Activating
        }
        Err(e) => {
            error!("Failed to start recording: {}", e);
            MicState::Idle
        }
    }
}

fn stop_recording(
    active_recording: &mut Option<RecordingHandle>,
    audio_pipeline: &AudioPipeline,
) -> MicState {
    let Some(mut recording) = active_recording.take() else {
        warn!("Hotkey stop without an active recording");
        return MicState::Idle;
    };
    info!("Recording stopped");

    match recording.finish() {
        Ok(Some(data)) => match audio_pipeline.submit(data) {
            Ok(SubmitResult::Discarded) => MicState::Idle,
            Ok(SubmitResult::Sent) => MicState::Processing,
            Err(e) => {
                error!("Failed to submit audio to processor: {:?}", e);
                MicState::Idle
            }
        },
        Ok(None) => {
            warn!("Recording finished but no data was recorded");
            MicState::Idle
        }
        Err(e) => {
            error!(error = ?e, "Failed to finish recording");
            MicState::Idle
        }
    }
}

fn reload_config(
    config_manager: &ConfigManager,
    config: &RwLock<voxpaste::Config>,
    hotkey_manager: &GlobalHotKeyManager,
    hotkey: &mut HotKey,
) {
    let changed = match config_manager.reload(&mut config.write()) {
        Ok(changed) => changed,
        Err(e) => {
            error!("Failed to reload config: {:?}", e);
            return;
        }
    };
    info!(changed, "Config reloaded");

    let next = config.read().hotkey_binding();
    if next == *hotkey {
        return;
    }
    if let Err(e) = hotkey_manager.unregister(*hotkey) {
        warn!("Failed to unregister previous hotkey: {}", e);
    }
    match hotkey_manager.register(next) {
        Ok(()) => {
            info!(hotkey = %config.read().hotkey(), "Hotkey registered");
            *hotkey = next;
        }
        Err(e) => {
            error!("Failed to register hotkey, keeping previous one: {}", e);
            hotkey_manager.register(*hotkey).ok();
        }
    }
}
