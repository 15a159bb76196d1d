pub mod logger;
pub mod types;
pub mod crypto;
pub mod catalog;
pub mod db;
pub mod bundled;
pub mod download;
pub mod search;
pub mod memos;
pub mod backup;
pub mod app_data;

use std::fs::create_dir_all;
use std::path::PathBuf;
use std::sync::OnceLock;

use anyhow::Result;
use app_dirs::{get_app_root, AppDataType, AppInfo};

use crate::app_data::AppData;

pub static PAGE_LEN: usize = 10;

pub const APP_INFO: AppInfo = AppInfo { name: "selah", author: "selah" };

/// Default directory for the on-device stores. Overridden by the
/// SELAH_DIR environment variable (see `AppData::from_env()`).
pub fn get_create_selah_app_root() -> Result<PathBuf> {
    let p = get_app_root(AppDataType::UserData, &APP_INFO)?;
    if !p.exists() {
        create_dir_all(&p)?;
    }
    Ok(p)
}

pub fn get_create_selah_assets_path() -> PathBuf {
    let p = get_create_selah_app_root()
        .unwrap_or(PathBuf::from("."))
        .join("app-assets/");
    if !p.exists() {
        let _ = create_dir_all(&p);
    }
    p
}

pub fn corpus_db_path(assets_dir: &PathBuf) -> PathBuf {
    assets_dir.join("corpus.sqlite3")
}

pub fn userdata_db_path(assets_dir: &PathBuf) -> PathBuf {
    assets_dir.join("userdata.sqlite3")
}

pub static APP_DATA: OnceLock<AppData> = OnceLock::new();

/// Initializes the process-wide AppData for app embedding. Tests
/// construct their own AppData instances instead (see AppData::open()).
pub fn init_app_data() -> bool {
    logger::init();
    let app_data = AppData::from_env().expect("Can't create AppData");
    APP_DATA.set(app_data).expect("AppData is already initialized");
    true
}

pub fn get_app_data() -> &'static AppData {
    APP_DATA.get().expect("AppData is not initialized")
}
