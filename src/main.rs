/*
============================================================================
restyle-preview - テーマフック動作確認ツール (main.rs)
============================================================================

【概要】
restyle ライブラリを自プロセスに適用し、指定したテーマファイルで
OpenThemeData が置き換えられることを確認するコマンドラインツール。

【使用方法】
  restyle-preview <theme-file> [CLASS ...]
  例: restyle-preview C:\Windows\Resources\Themes\aero\aero.msstyles BUTTON EDIT

【処理フロー】
1. uxtheme.dll をロード（フック対象の前提条件）
2. load_global_theme でテーマ読み込み
3. initialize_hooks で OpenThemeData をフック
4. 各クラスについて、元の関数とフック後の関数で HTHEME を取得して表示
5. uninitialize → unload_global_theme で後始末

【ログ】
RUST_LOG で出力レベルを指定（既定は info）。

============================================================================
*/

use color_eyre::eyre::Result;
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();
}

#[cfg(windows)]
fn main() -> Result<()> {
    use std::ffi::c_void;

    use color_eyre::eyre::{WrapErr, bail, eyre};
    use restyle::{constants::OPEN_THEME_DATA, hook::open_theme_data::OpenThemeDataFn};
    use windows::{
        Win32::System::LibraryLoader::{GetProcAddress, LoadLibraryW},
        core::{s, w},
    };

    type CloseThemeDataFn = unsafe extern "system" fn(isize) -> i32;

    color_eyre::install()?;
    init_tracing();

    let mut args = std::env::args_os().skip(1);
    let Some(theme_path) = args.next() else {
        bail!("usage: restyle-preview <theme-file> [CLASS ...]");
    };
    let mut classes: Vec<String> = args.map(|a| a.to_string_lossy().into_owned()).collect();
    if classes.is_empty() {
        classes = vec!["BUTTON".to_owned(), "EDIT".to_owned()];
    }

    // フック対象の uxtheme.dll はプロセス内にロード済みである必要がある
    let uxtheme = unsafe { LoadLibraryW(w!("uxtheme.dll")) }.wrap_err("uxtheme.dll could not be loaded")?;
    let (open_theme_data, close_theme_data) = unsafe {
        let open = GetProcAddress(uxtheme, s!("OpenThemeData"))
            .ok_or_else(|| eyre!("{OPEN_THEME_DATA} is not exported"))?;
        let close = GetProcAddress(uxtheme, s!("CloseThemeData"))
            .ok_or_else(|| eyre!("CloseThemeData is not exported"))?;
        (
            std::mem::transmute::<_, OpenThemeDataFn>(open),
            std::mem::transmute::<_, CloseThemeDataFn>(close),
        )
    };

    tracing::info!("OS build {}", restyle::os_build_number());

    restyle::load_global_theme(&theme_path)
        .wrap_err_with(|| format!("failed to load {}", theme_path.to_string_lossy()))?;
    restyle::initialize_hooks()?;

    let original = restyle::original_open_theme_data();
    for class in &classes {
        let wide: Vec<u16> = class.encode_utf16().chain(std::iter::once(0)).collect();
        let hooked = unsafe { open_theme_data(std::ptr::null_mut::<c_void>(), wide.as_ptr()) };
        let os_resolved = original.map(|f| unsafe { f(std::ptr::null_mut(), wide.as_ptr()) });

        println!("{class:<16} hooked=0x{hooked:X} original={os_resolved:X?}");

        unsafe {
            if hooked != 0 {
                close_theme_data(hooked);
            }
            if let Some(handle) = os_resolved.filter(|&h| h != 0) {
                close_theme_data(handle);
            }
        }
    }

    let teardown = restyle::uninitialize();
    if teardown.is_ok() {
        restyle::unload_global_theme();
    }
    teardown?;

    Ok(())
}

#[cfg(not(windows))]
fn main() -> Result<()> {
    color_eyre::install()?;
    init_tracing();
    Err(color_eyre::eyre::eyre!("restyle-preview only runs on Windows"))
}
