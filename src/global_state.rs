/*
============================================================================
グローバル状態管理モジュール (global_state.rs)
============================================================================

【ファイル概要】
プロセス内で共有されるテーマ管理（ThemeManager）とフック管理（InterceptionEngine）を
保持し、Rust向けの安全なAPIを提供する。

【主要機能】
1. load_global_theme：テーマの読み込み・差し替え
2. initialize_hooks / uninitialize：OpenThemeData フックの設置・解除
3. unload_global_theme：フック解除後の即時解放
4. original_open_theme_data：元の OpenThemeData へのトランポリン

【呼び出し順序】
ホストプロセス起動 → load_global_theme() → initialize_hooks()
→（以降の OpenThemeData は全て読み込んだテーマを返す）→ uninitialize()

============================================================================
*/

use std::{
    path::Path,
    sync::{Arc, Mutex, PoisonError},
};

use once_cell::sync::Lazy;

use crate::{
    constants::OPEN_THEME_DATA,
    error::{HookError, ThemeError},
    hook::{
        InterceptionEngine,
        detour::DetourBackend,
        open_theme_data::{OpenThemeDataFn, open_theme_data_target},
    },
    theme_manager::{ThemeManager, ThemeManagerConfig},
    uxtheme::Win32ThemeApi,
};

// 【グローバルテーマ】フック本体から参照される現在のテーマ
static THEMES: Lazy<ThemeManager<Win32ThemeApi>> =
    Lazy::new(|| ThemeManager::new(Arc::new(Win32ThemeApi::new()), ThemeManagerConfig::default()));

// 【グローバルフック】設置済みフックと基盤の状態
static ENGINE: Lazy<Mutex<InterceptionEngine<DetourBackend>>> =
    Lazy::new(|| Mutex::new(InterceptionEngine::new(DetourBackend::new())));

pub fn global_themes() -> &'static ThemeManager<Win32ThemeApi> {
    &THEMES
}

/// テーマファイルを読み込み、プロセス全体の現在のテーマにする
pub fn load_global_theme(path: impl AsRef<Path>) -> Result<(), ThemeError> {
    THEMES.load_path(path.as_ref()).map(drop)
}

/// null 終端UTF-16のパスで読み込む（C ABI用）
pub fn load_global_theme_wide(path: &[u16]) -> Result<(), ThemeError> {
    THEMES.load(path).map(drop)
}

/// 現在のテーマを即時解放する（フック解除後に呼ぶこと）
pub fn unload_global_theme() -> bool {
    THEMES.unload()
}

pub fn initialize_hooks() -> Result<(), HookError> {
    let mut engine = ENGINE.lock().unwrap_or_else(PoisonError::into_inner);
    engine.initialize_hooks(&open_theme_data_target())
}

pub fn uninitialize() -> Result<(), HookError> {
    let mut engine = ENGINE.lock().unwrap_or_else(PoisonError::into_inner);
    engine.uninitialize()
}

/// フック設置中のみ、元の OpenThemeData を返す
pub fn original_open_theme_data() -> Option<OpenThemeDataFn> {
    let engine = ENGINE.lock().unwrap_or_else(PoisonError::into_inner);
    engine
        .trampoline(OPEN_THEME_DATA)
        .map(|trampoline| unsafe { std::mem::transmute::<*const std::ffi::c_void, OpenThemeDataFn>(trampoline) })
}
