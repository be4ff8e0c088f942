/*
============================================================================
uxtheme.dll 非公開API連携モジュール (uxtheme.rs)
============================================================================

【ファイル概要】
uxtheme.dll の序数エクスポートを型付き関数ポインタの表（UxThemeExports）として解決し、
`ThemeApi` トレイトのWindows実装（Win32ThemeApi）を提供する。

【主要機能】
1. UxThemeExports::resolve：序数 7 / 92 / 16 を GetProcAddress で解決
2. LoaderShim：LoaderLoadTheme の二つのABI形状を一つの呼び出し口にまとめる
3. セクション操作：MapViewOfFile / UnmapViewOfFile / CloseHandle

【重要な制約】
- uxtheme.dll はホストプロセスで既にロード済みであること（ここではロードしない）
- 序数の関数は非公開ABI。誤った形状で呼ぶとスタックが壊れるため、
  LoaderLoadTheme は必ず LoaderAbi に対応する形状で呼び出す
- 解決結果は初回成功時のみキャッシュする（失敗は次回再試行）

============================================================================
*/

use std::ffi::c_void;

use once_cell::sync::OnceCell;
use windows::{
    Win32::{
        Foundation::{CloseHandle, HANDLE},
        System::{
            LibraryLoader::{GetModuleHandleW, GetProcAddress},
            Memory::{FILE_MAP, MEMORY_MAPPED_VIEW_ADDRESS, MapViewOfFile, UnmapViewOfFile},
        },
    },
    core::{PCSTR, w},
};

use crate::{
    constants::{
        ORDINAL_GET_THEME_DEFAULTS, ORDINAL_LOADER_LOAD_THEME, ORDINAL_OPEN_THEME_DATA_FROM_FILE,
        SECTION_VIEW_ACCESS, THEME_NAME_CAPACITY, UXTHEME_DLL,
    },
    error::ThemeError,
    handles::{SectionHandle, SectionPair, SectionView, ThemeHandle, WindowHandle},
    theme::ThemeFile,
    theme_api::{LoaderFailure, ThemeApi, ThemeDefaults},
    version::{LoaderAbi, os_build_number},
};

type RawProc = unsafe extern "system" fn() -> isize;

type GetThemeDefaultsFn = unsafe extern "system" fn(
    path: *const u16,
    color_name: *mut u16,
    color_name_len: u32,
    size_name: *mut u16,
    size_name_len: u32,
) -> i32;

type LoaderLoadThemeLegacyFn = unsafe extern "system" fn(
    theme_file: *mut c_void,
    theme_library: *mut c_void,
    path: *const u16,
    color_param: *const u16,
    size_param: *const u16,
    sharable_section: *mut SectionHandle,
    sharable_section_name: *mut u16,
    sharable_section_name_len: i32,
    non_sharable_section: *mut SectionHandle,
    non_sharable_section_name: *mut u16,
    non_sharable_section_name_len: i32,
    custom_load_handler: *mut c_void,
    reuse_section: *mut SectionHandle,
    a: i32,
    b: i32,
    emulate_global: i32,
) -> i32;

type LoaderLoadThemeModernFn = unsafe extern "system" fn(
    theme_file: *mut c_void,
    theme_library: *mut c_void,
    path: *const u16,
    color_param: *const u16,
    size_param: *const u16,
    sharable_section: *mut SectionHandle,
    sharable_section_name: *mut u16,
    sharable_section_name_len: i32,
    non_sharable_section: *mut SectionHandle,
    non_sharable_section_name: *mut u16,
    non_sharable_section_name_len: i32,
    custom_load_handler: *mut c_void,
    reuse_section: *mut SectionHandle,
    a: i32,
    b: i32,
) -> i32;

type OpenThemeDataFromFileFn = unsafe extern "system" fn(
    theme: *const ThemeFile,
    hwnd: *mut c_void,
    class_list: *const u16,
    flags: u32,
) -> isize;

/// LoaderLoadTheme の呼び出し口（ABI形状ごと）
#[derive(Clone, Copy)]
enum LoaderShim {
    Legacy(LoaderLoadThemeLegacyFn),
    Modern(LoaderLoadThemeModernFn),
}

impl LoaderShim {
    fn select(abi: LoaderAbi, proc: RawProc) -> Self {
        unsafe {
            match abi {
                LoaderAbi::Legacy => LoaderShim::Legacy(std::mem::transmute::<RawProc, LoaderLoadThemeLegacyFn>(proc)),
                LoaderAbi::Modern => LoaderShim::Modern(std::mem::transmute::<RawProc, LoaderLoadThemeModernFn>(proc)),
            }
        }
    }

    unsafe fn call(
        self,
        path: *const u16,
        color: *const u16,
        size: *const u16,
        sharable: &mut SectionHandle,
        non_sharable: &mut SectionHandle,
    ) -> i32 {
        let null = std::ptr::null_mut();
        unsafe {
            match self {
                LoaderShim::Legacy(f) => f(
                    null, null, path, color, size, sharable, null.cast(), 0, non_sharable,
                    null.cast(), 0, null, null.cast(), 0, 0, 0,
                ),
                LoaderShim::Modern(f) => f(
                    null, null, path, color, size, sharable, null.cast(), 0, non_sharable,
                    null.cast(), 0, null, null.cast(), 0, 0,
                ),
            }
        }
    }
}

/// uxtheme.dll の序数エクスポート表
struct UxThemeExports {
    get_theme_defaults: GetThemeDefaultsFn,
    loader_load_theme: RawProc,
    open_theme_data_from_file: OpenThemeDataFromFileFn,
}

impl UxThemeExports {
    fn resolve() -> Result<Self, ThemeError> {
        unsafe {
            let module = GetModuleHandleW(w!("uxtheme.dll"))
                .map_err(|_| ThemeError::missing(UXTHEME_DLL))?;

            let by_ordinal = |ordinal: u16| -> Result<RawProc, ThemeError> {
                GetProcAddress(module, PCSTR(ordinal as usize as *const u8))
                    .ok_or_else(|| ThemeError::missing(format!("{UXTHEME_DLL}#{ordinal}")))
            };

            let exports = UxThemeExports {
                get_theme_defaults: std::mem::transmute::<RawProc, GetThemeDefaultsFn>(by_ordinal(
                    ORDINAL_GET_THEME_DEFAULTS,
                )?),
                loader_load_theme: by_ordinal(ORDINAL_LOADER_LOAD_THEME)?,
                open_theme_data_from_file: std::mem::transmute::<RawProc, OpenThemeDataFromFileFn>(
                    by_ordinal(ORDINAL_OPEN_THEME_DATA_FROM_FILE)?,
                ),
            };

            tracing::debug!("resolved {} private exports", UXTHEME_DLL);
            Ok(exports)
        }
    }
}

/// 【Win32ThemeApi】ThemeApi のWindows実装
#[derive(Default)]
pub struct Win32ThemeApi {
    exports: OnceCell<UxThemeExports>,
}

impl Win32ThemeApi {
    pub fn new() -> Self {
        Self::default()
    }

    fn exports(&self) -> Result<&UxThemeExports, ThemeError> {
        self.exports.get_or_try_init(UxThemeExports::resolve)
    }
}

fn trim_wide(buffer: &[u16]) -> Vec<u16> {
    let len = buffer.iter().position(|&c| c == 0).unwrap_or(buffer.len());
    buffer[..len].iter().copied().chain(std::iter::once(0)).collect()
}

impl ThemeApi for Win32ThemeApi {
    fn build_number(&self) -> u32 {
        os_build_number()
    }

    fn theme_defaults(&self, path: &[u16]) -> Result<ThemeDefaults, ThemeError> {
        let exports = self.exports()?;
        let mut color = [0u16; THEME_NAME_CAPACITY];
        let mut size = [0u16; THEME_NAME_CAPACITY];

        let hr = unsafe {
            (exports.get_theme_defaults)(
                path.as_ptr(),
                color.as_mut_ptr(),
                color.len() as u32,
                size.as_mut_ptr(),
                size.len() as u32,
            )
        };
        if hr < 0 {
            return Err(ThemeError::InvalidThemeFile { code: hr });
        }

        Ok(ThemeDefaults {
            color_name: trim_wide(&color),
            size_name: trim_wide(&size),
        })
    }

    fn load_sections(
        &self,
        abi: LoaderAbi,
        path: &[u16],
        defaults: &ThemeDefaults,
    ) -> Result<SectionPair, LoaderFailure> {
        let exports = self.exports()?;
        let shim = LoaderShim::select(abi, exports.loader_load_theme);

        let mut sharable = SectionHandle::NULL;
        let mut non_sharable = SectionHandle::NULL;
        let hr = unsafe {
            shim.call(
                path.as_ptr(),
                defaults.color_name.as_ptr(),
                defaults.size_name.as_ptr(),
                &mut sharable,
                &mut non_sharable,
            )
        };

        let sections = SectionPair {
            sharable,
            non_sharable,
        };
        if hr != 0 {
            return Err(LoaderFailure {
                error: ThemeError::ThemeLoadFailed { code: hr },
                sections,
            });
        }
        Ok(sections)
    }

    fn map_section(&self, section: SectionHandle) -> SectionView {
        if section.is_null() {
            return SectionView::NULL;
        }
        let view = unsafe { MapViewOfFile(HANDLE(section.0), FILE_MAP(SECTION_VIEW_ACCESS), 0, 0, 0) };
        if view.Value.is_null() {
            tracing::warn!("MapViewOfFile failed for section {:?}", section);
        }
        SectionView(view.Value)
    }

    fn unmap_view(&self, view: SectionView) {
        if let Err(e) = unsafe { UnmapViewOfFile(MEMORY_MAPPED_VIEW_ADDRESS { Value: view.0 }) } {
            tracing::warn!("UnmapViewOfFile failed: {e}");
        }
    }

    fn close_section(&self, section: SectionHandle) {
        if section.is_null() {
            return;
        }
        if let Err(e) = unsafe { CloseHandle(HANDLE(section.0)) } {
            tracing::warn!("CloseHandle failed for section {:?}: {e}", section);
        }
    }

    unsafe fn open_theme_data_from_file(
        &self,
        theme: &ThemeFile,
        window: WindowHandle,
        class_list: *const u16,
        flags: u32,
    ) -> ThemeHandle {
        match self.exports() {
            Ok(exports) => ThemeHandle(unsafe {
                (exports.open_theme_data_from_file)(theme, window.0, class_list, flags)
            }),
            Err(e) => {
                tracing::warn!("OpenThemeDataFromFile unavailable: {e}");
                ThemeHandle::NULL
            }
        }
    }
}
