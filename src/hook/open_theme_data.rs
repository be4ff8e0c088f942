/*
============================================================================
OpenThemeData フックモジュール (hook/open_theme_data.rs)
============================================================================

【ファイル概要】
uxtheme!OpenThemeData の置き換え関数と、その対象アドレスの探索を提供する。

【制御フロー】
任意のコード → OpenThemeData(hwnd, pszClassList)
             → open_theme_data_hook()
             → ThemeManager::open_theme_data()（現在のテーマのスナップショット）
             → OpenThemeDataFromFile(theme, hwnd, pszClassList, 0)

============================================================================
*/

use std::ffi::c_void;

use windows::{
    Win32::System::LibraryLoader::{GetModuleHandleW, GetProcAddress},
    core::{s, w},
};

use crate::{
    constants::OPEN_THEME_DATA,
    global_state::global_themes,
    handles::WindowHandle,
    hook::HookTarget,
};

/// OpenThemeData と同じシグネチャ（HWND, LPCWSTR）-> HTHEME
pub type OpenThemeDataFn = unsafe extern "system" fn(*mut c_void, *const u16) -> isize;

/// OpenThemeData の置き換え
pub unsafe extern "system" fn open_theme_data_hook(hwnd: *mut c_void, class_list: *const u16) -> isize {
    unsafe { global_themes().open_theme_data(WindowHandle(hwnd), class_list) }.0
}

/// 読み込み済みの uxtheme.dll から OpenThemeData を探す
pub fn locate_open_theme_data() -> Option<*const c_void> {
    unsafe {
        let module = GetModuleHandleW(w!("uxtheme.dll")).ok()?;
        GetProcAddress(module, s!("OpenThemeData")).map(|f| f as *const c_void)
    }
}

pub fn open_theme_data_target() -> HookTarget {
    let replacement: OpenThemeDataFn = open_theme_data_hook;
    HookTarget {
        name: OPEN_THEME_DATA,
        locate: locate_open_theme_data,
        replacement: replacement as *const c_void,
    }
}
