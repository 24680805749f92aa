//! Open CamStudio - camera photos and clips, kept in a local gallery.
//!
//! The widget core (stream controller, capture engine, media library) is
//! platform independent. The `desktop` feature adds the Tauri shell.

pub mod capture;
#[cfg(feature = "desktop")]
pub mod commands;
pub mod config;
pub mod gallery;
pub mod library;
pub mod recorder;
pub mod stream;
pub mod utils;
pub mod widget;

#[cfg(test)]
mod testing;

pub use config::CameraConfig;
pub use widget::CameraWidget;

#[cfg(feature = "desktop")]
use commands::camera::CameraState;
#[cfg(feature = "desktop")]
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Load the config, falling back to defaults when it is unreadable
#[cfg(feature = "desktop")]
fn load_config() -> CameraConfig {
    match CameraConfig::load_default().and_then(|config| config.validate().map(|_| config)) {
        Ok(config) => config,
        Err(e) => {
            tracing::warn!("Using default camera config: {}", e);
            CameraConfig::default()
        }
    }
}

#[cfg(feature = "desktop")]
fn build_widget(config: CameraConfig) -> CameraWidget {
    use std::sync::Arc;

    let devices = Arc::new(capture::native::NativeDevices::new());
    let recorders = Arc::new(recorder::FfmpegRecorderFactory::new(config.ffmpeg_path.clone()));

    match CameraWidget::from_config(config.clone(), devices.clone(), recorders.clone()) {
        Ok(widget) => widget,
        Err(e) => {
            tracing::error!("Media library unavailable, keeping captures in memory: {}", e);
            let config = CameraConfig {
                persistence: config::PersistenceMode::Volatile,
                ..config
            };
            let library = library::MediaLibrary::volatile(Arc::new(library::ObjectUrlRegistry::new()));
            CameraWidget::new(config, devices, recorders, library)
        }
    }
}

/// Initialize the application
#[cfg(feature = "desktop")]
pub fn run() -> tauri::Result<()> {
    use tauri::Manager;

    // Initialize tracing/logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "open_camstudio=debug,tauri=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Open CamStudio v{}", env!("CARGO_PKG_VERSION"));

    let widget = build_widget(load_config());

    let app = tauri::Builder::default()
        .manage(CameraState::new(widget))
        .register_uri_scheme_protocol(library::OBJECT_URL_SCHEME, |ctx, request| {
            let state = ctx.app_handle().state::<CameraState>();
            commands::camera::object_url_response(&state.urls, request.uri().path())
        })
        .invoke_handler(tauri::generate_handler![
            commands::camera::get_widget_view,
            commands::camera::set_mode,
            commands::camera::capture_photo,
            commands::camera::start_recording,
            commands::camera::stop_recording,
            commands::camera::toggle_recording,
            commands::camera::delete_item,
            commands::camera::select_item,
            commands::camera::deselect_item,
            commands::camera::dismiss_alert,
            commands::camera::get_preview_frame,
            commands::camera::get_camera_status,
        ])
        .setup(|app| {
            // Mount: bind the preview for the initial mode
            let widget = app.state::<CameraState>().widget.clone();
            tauri::async_runtime::spawn(async move {
                widget.lock().await.start().await;
            });
            Ok(())
        })
        .build(tauri::generate_context!())?;

    app.run(|handle, event| {
        if let tauri::RunEvent::Exit = event {
            // Unmount: release the camera and revoke object URLs
            let widget = handle.state::<CameraState>().widget.clone();
            tauri::async_runtime::block_on(async move {
                widget.lock().await.shutdown().await;
            });
        }
    });

    Ok(())
}
