fn main() {
    // The Tauri context (tauri.conf.json, ui/) is only compiled into the desktop shell
    #[cfg(feature = "desktop")]
    tauri_build::build()
}
