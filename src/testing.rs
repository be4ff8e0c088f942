//! テスト用のOS層・フック基盤モック

use std::{
    collections::{HashMap, HashSet},
    ffi::c_void,
    sync::{Mutex, PoisonError},
};

use crate::{
    error::{HookError, ThemeError},
    handles::{SectionHandle, SectionPair, SectionView, ThemeHandle, WindowHandle},
    hook::HookBackend,
    theme::ThemeFile,
    theme_api::{LoaderFailure, ThemeApi, ThemeDefaults, wide_from_ptr, wide_to_string},
    version::LoaderAbi,
};

/// フック本体から OpenThemeDataFromFile に届いた呼び出し
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenCall {
    pub sharable: SectionHandle,
    pub window: usize,
    pub class_list: String,
    pub flags: u32,
}

#[derive(Default)]
struct MockState {
    next_handle: usize,
    live: HashSet<SectionHandle>,
    closes: HashMap<SectionHandle, u32>,
    maps: usize,
    unmaps: usize,
    failing_maps: HashSet<SectionHandle>,
    defaults_error: Option<i32>,
    load_error: Option<i32>,
    // 失敗時にもセクションを返す（片方だけの場合あり）
    load_error_with_sections: Option<i32>,
    failed_load_sharable_only: bool,
    last_failed_sections: Option<SectionPair>,
    abis: Vec<LoaderAbi>,
    opened: Vec<OpenCall>,
}

pub struct MockThemeApi {
    build: u32,
    state: Mutex<MockState>,
}

impl MockThemeApi {
    pub fn new(build: u32) -> Self {
        MockThemeApi {
            build,
            state: Mutex::new(MockState {
                next_handle: 0x100,
                ..Default::default()
            }),
        }
    }

    fn state(&self) -> std::sync::MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn next_sections(&self) -> SectionPair {
        let mut state = self.state();
        let sharable = SectionHandle(state.next_handle as *mut c_void);
        let non_sharable = SectionHandle((state.next_handle + 4) as *mut c_void);
        state.next_handle += 8;
        state.live.insert(sharable);
        state.live.insert(non_sharable);
        SectionPair { sharable, non_sharable }
    }

    pub fn fail_mapping(&self, section: SectionHandle) {
        self.state().failing_maps.insert(section);
    }

    pub fn fail_defaults(&self, code: Option<i32>) {
        self.state().defaults_error = code;
    }

    pub fn fail_load(&self, code: Option<i32>) {
        self.state().load_error = code;
    }

    /// ローダーが失敗しつつ新しいセクションを返す状態にする
    pub fn fail_load_with_sections(&self, code: Option<i32>) {
        self.state().load_error_with_sections = code;
    }

    /// 失敗時に返すセクションを共有側だけにする
    pub fn fail_load_returning_only_sharable(&self) {
        self.state().failed_load_sharable_only = true;
    }

    /// 直近の失敗でローダーが返したセクション
    pub fn last_failed_sections(&self) -> Option<SectionPair> {
        self.state().last_failed_sections
    }

    pub fn map_count(&self) -> usize {
        self.state().maps
    }

    pub fn unmap_count(&self) -> usize {
        self.state().unmaps
    }

    pub fn close_count(&self, section: SectionHandle) -> u32 {
        self.state().closes.get(&section).copied().unwrap_or(0)
    }

    /// 作成済みでまだクローズされていないセクション数
    pub fn live_sections(&self) -> usize {
        self.state().live.len()
    }

    /// 二回以上クローズされたセクションがあるか
    pub fn any_double_close(&self) -> bool {
        self.state().closes.values().any(|&n| n > 1)
    }

    pub fn abis(&self) -> Vec<LoaderAbi> {
        self.state().abis.clone()
    }

    pub fn open_calls(&self) -> Vec<OpenCall> {
        self.state().opened.clone()
    }
}

impl ThemeApi for MockThemeApi {
    fn build_number(&self) -> u32 {
        self.build
    }

    fn theme_defaults(&self, _path: &[u16]) -> Result<ThemeDefaults, ThemeError> {
        if let Some(code) = self.state().defaults_error {
            return Err(ThemeError::InvalidThemeFile { code });
        }
        Ok(ThemeDefaults {
            color_name: "NormalColor\0".encode_utf16().collect(),
            size_name: "NormalSize\0".encode_utf16().collect(),
        })
    }

    fn load_sections(
        &self,
        abi: LoaderAbi,
        _path: &[u16],
        _defaults: &ThemeDefaults,
    ) -> Result<SectionPair, LoaderFailure> {
        let (load_error, with_sections, sharable_only) = {
            let mut state = self.state();
            state.abis.push(abi);
            (state.load_error, state.load_error_with_sections, state.failed_load_sharable_only)
        };
        if let Some(code) = load_error {
            return Err(ThemeError::ThemeLoadFailed { code }.into());
        }

        let sections = self.next_sections();
        let Some(code) = with_sections else {
            return Ok(sections);
        };

        let mut returned = sections;
        if sharable_only {
            // 返さなかった側はローダー内部で片付いた扱い
            let mut state = self.state();
            state.live.remove(&sections.non_sharable);
            returned.non_sharable = SectionHandle::NULL;
        }
        self.state().last_failed_sections = Some(returned);
        Err(LoaderFailure {
            error: ThemeError::ThemeLoadFailed { code },
            sections: returned,
        })
    }

    fn map_section(&self, section: SectionHandle) -> SectionView {
        let mut state = self.state();
        if state.failing_maps.contains(&section) {
            return SectionView::NULL;
        }
        state.maps += 1;
        SectionView((section.0 as usize + 0x1_0000) as *mut c_void)
    }

    fn unmap_view(&self, _view: SectionView) {
        self.state().unmaps += 1;
    }

    fn close_section(&self, section: SectionHandle) {
        let mut state = self.state();
        state.live.remove(&section);
        *state.closes.entry(section).or_insert(0) += 1;
    }

    unsafe fn open_theme_data_from_file(
        &self,
        theme: &ThemeFile,
        window: WindowHandle,
        class_list: *const u16,
        flags: u32,
    ) -> ThemeHandle {
        let class_list = if class_list.is_null() {
            String::new()
        } else {
            wide_to_string(unsafe { wide_from_ptr(class_list) })
        };
        let sharable = theme.sharable().0;
        self.state().opened.push(OpenCall {
            sharable,
            window: window.0 as usize,
            class_list,
            flags,
        });
        ThemeHandle(sharable.0 as isize)
    }
}

/// MinHook 相当のフック基盤モック
///
/// `redirects` は「対象アドレス → 差し替え先」で、書き換えられたコードを表す。
/// `fail_uninitialize` の間は解除に失敗し、初期化状態とリダイレクトを残す。
/// フラグを戻して再度 uninitialize すれば解除できる。
#[derive(Debug, Default)]
pub struct MockHookBackend {
    pub initialized: bool,
    pub redirects: HashMap<usize, usize>,
    pub fail_initialize: bool,
    pub fail_create: bool,
    pub fail_uninitialize: bool,
}

impl HookBackend for MockHookBackend {
    fn initialize(&mut self) -> Result<(), HookError> {
        if self.fail_initialize || self.initialized || !self.redirects.is_empty() {
            return Err(HookError::SubsystemInit {
                reason: "mock subsystem unavailable".into(),
            });
        }
        self.initialized = true;
        Ok(())
    }

    unsafe fn create_hook(
        &mut self,
        target: *const c_void,
        replacement: *const c_void,
    ) -> Result<*const c_void, String> {
        if !self.initialized {
            return Err("subsystem not initialized".into());
        }
        if self.fail_create {
            return Err("code page is write-protected".into());
        }
        if self.redirects.contains_key(&(target as usize)) {
            return Err("target already hooked".into());
        }
        self.redirects.insert(target as usize, replacement as usize);
        Ok((target as usize + 0x40) as *const c_void)
    }

    fn uninitialize(&mut self) -> Result<(), HookError> {
        if !self.initialized || self.fail_uninitialize {
            return Err(HookError::PartialTeardown {
                reason: "mock subsystem in inconsistent state".into(),
            });
        }
        self.redirects.clear();
        self.initialized = false;
        Ok(())
    }
}
