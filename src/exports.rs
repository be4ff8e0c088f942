/*
============================================================================
C ABI エクスポートモジュール (exports.rs)
============================================================================

【ファイル概要】
ホストプロセスから呼び出される DLL エクスポート関数。

  HRESULT    LoadGlobalTheme(LPCWSTR lpszThemeFilePath);
  INITRESULT InitializeHooks(void);
  INITRESULT Uninitialize(void);

INITRESULT は { SUCCEEDED=0, FAILED=1, FAILED_MINHOOK_INIT=2, FAILED_MINHOOK_HOOK=3 }。

============================================================================
*/

#![allow(non_snake_case)]

use crate::{
    error::{InitResult, UninitResult},
    global_state::{initialize_hooks, load_global_theme_wide, uninitialize},
    theme_api::load_raw_path,
};

/// # Safety
/// `path` は null か、null 終端の有効なUTF-16であること。
#[unsafe(no_mangle)]
pub unsafe extern "C" fn LoadGlobalTheme(path: *const u16) -> i32 {
    unsafe { load_raw_path(path, load_global_theme_wide) }
}

#[unsafe(no_mangle)]
pub extern "C" fn InitializeHooks() -> InitResult {
    InitResult::from(&initialize_hooks())
}

#[unsafe(no_mangle)]
pub extern "C" fn Uninitialize() -> UninitResult {
    UninitResult::from(&uninitialize())
}
