/*
============================================================================
テーマリソース管理モジュール (theme_manager.rs)
============================================================================

【ファイル概要】
プロセス内で「現在のテーマ」を一つだけ保持し、テーマの読み込み・差し替え・
解放を管理する。フック本体（OpenThemeData の置き換え）の処理もここに置く。

【主要機能】
1. load：GetThemeDefaults → LoaderLoadTheme（ABI形状選択）→ マップ → 公開
   ローダーが失敗しつつハンドルを返した場合はここで閉じる
2. 旧テーマの遅延解放：一定時間待ってから別スレッドで解放
3. open_theme_data：現在のテーマのスナップショットで OpenThemeDataFromFile を呼ぶ
4. unload：フック解除後に現在のテーマを即時解放

【状態フロー図】
未読み込み → load() 成功 → テーマA公開
                 ↓ load() 成功
           テーマB公開 ─→ Aを解放スレッドへ（待機後に解放）
                 ↓ load() 失敗
           テーマBのまま（変更なし）

【並行性】
- 読み手（フック呼び出し）：RwLock の読み取りで Arc を一度だけ複製し、呼び出し中はそれを使う
- 書き手（load）：load_lock で直列化し、差し替えた旧テーマを解放スレッドへ渡す
- 解放スレッドは起動時に受け取ったインスタンスだけを解放する
- 待機時間は経験的な値であり保証ではない。Arc により呼び出し中の読み手がいる間は解放されないが、
  OS側がHTHEME経由でビューを参照し続ける場合は待機時間のみが頼り

============================================================================
*/

use std::{
    mem::ManuallyDrop,
    path::Path,
    sync::{Arc, Mutex, PoisonError, RwLock},
    thread::{self, JoinHandle},
    time::Duration,
};

use crate::{
    constants::{RELEASE_THREAD_NAME, THEME_RELEASE_DELAY},
    error::ThemeError,
    handles::{ThemeHandle, WindowHandle},
    theme::LoadedTheme,
    theme_api::{LoaderFailure, ThemeApi, wide_path, wide_to_string},
    version::LoaderAbi,
};

/// テーマ管理の設定
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThemeManagerConfig {
    /// 差し替えられたテーマを解放するまでの待機時間
    pub release_delay: Duration,
}

impl Default for ThemeManagerConfig {
    fn default() -> Self {
        Self {
            release_delay: THEME_RELEASE_DELAY,
        }
    }
}

/// 遅延解放スレッドのハンドル
///
/// 破棄しても解放はキャンセルされない。
#[derive(Debug)]
pub struct PendingRelease {
    handle: JoinHandle<()>,
}

impl PendingRelease {
    /// 解放完了まで待つ
    pub fn wait(self) {
        if self.handle.join().is_err() {
            tracing::error!("theme release worker panicked");
        }
    }
}

/// 【ThemeManager】現在のテーマを保持する差し替え可能なスロット
pub struct ThemeManager<A: ThemeApi> {
    api: Arc<A>,
    config: ThemeManagerConfig,
    current: RwLock<Option<Arc<LoadedTheme<A>>>>,
    load_lock: Mutex<()>,
}

impl<A: ThemeApi> ThemeManager<A> {
    pub fn new(api: Arc<A>, config: ThemeManagerConfig) -> Self {
        Self {
            api,
            config,
            current: RwLock::new(None),
            load_lock: Mutex::new(()),
        }
    }

    pub fn api(&self) -> &Arc<A> {
        &self.api
    }

    pub fn config(&self) -> ThemeManagerConfig {
        self.config
    }

    pub fn load_path(&self, path: &Path) -> Result<Option<PendingRelease>, ThemeError> {
        self.load(&wide_path(path))
    }

    /// テーマファイルを読み込み、現在のテーマとして公開する
    ///
    /// `path` は null 終端のUTF-16。失敗時は現在のテーマに触れない。
    /// 成功時、置き換えられた旧テーマがあればその遅延解放ハンドルを返す。
    pub fn load(&self, path: &[u16]) -> Result<Option<PendingRelease>, ThemeError> {
        let _guard = self.load_lock.lock().unwrap_or_else(PoisonError::into_inner);

        tracing::debug!("loading theme {}", wide_to_string(path));

        let defaults = self.api.theme_defaults(path).inspect_err(|e| {
            tracing::warn!("GetThemeDefaults failed: {e}");
        })?;

        let abi = LoaderAbi::classify(self.api.build_number());
        let sections = self
            .api
            .load_sections(abi, path, &defaults)
            .map_err(|failure| self.discard_failed_load(abi, failure))?;

        let theme = Arc::new(LoadedTheme::map(Arc::clone(&self.api), sections));
        tracing::info!(
            "theme loaded (color={}, size={}, abi={abi:?})",
            wide_to_string(&defaults.color_name),
            wide_to_string(&defaults.size_name)
        );

        Ok(self.publish(theme).and_then(|previous| self.retire(previous)))
    }

    /// 現在のテーマが存在するか
    pub fn is_loaded(&self) -> bool {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// 現在のテーマの参照を一度だけ取得する
    pub fn snapshot(&self) -> Option<Arc<LoadedTheme<A>>> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// OpenThemeData の置き換え処理
    ///
    /// ウィンドウとクラスリストは素通しし、現在のテーマから HTHEME を生成する。
    /// テーマ未読み込みの場合は null を返す。
    ///
    /// # Safety
    /// `class_list` は null か、呼び出し中有効な null 終端UTF-16であること。
    pub unsafe fn open_theme_data(&self, window: WindowHandle, class_list: *const u16) -> ThemeHandle {
        let Some(theme) = self.snapshot() else {
            tracing::debug!("OpenThemeData called before any theme was loaded");
            return ThemeHandle::NULL;
        };

        tracing::trace!("serving OpenThemeData from loaded theme");
        unsafe { self.api.open_theme_data_from_file(theme.file(), window, class_list, 0) }
    }

    /// 現在のテーマを即時解放する
    ///
    /// フックが解除され、呼び出し中の読み手がいないときにのみ使うこと。
    pub fn unload(&self) -> bool {
        let _guard = self.load_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let previous = self
            .current
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        previous.is_some()
    }

    /// ローダーが失敗時に返したハンドルを閉じ、エラーだけを返す
    fn discard_failed_load(&self, abi: LoaderAbi, failure: LoaderFailure) -> ThemeError {
        tracing::warn!("LoaderLoadTheme ({abi:?}) failed: {}", failure.error);
        for section in [failure.sections.sharable, failure.sections.non_sharable] {
            if !section.is_null() {
                tracing::debug!("closing section {section:?} returned by failed load");
                self.api.close_section(section);
            }
        }
        failure.error
    }

    fn publish(&self, theme: Arc<LoadedTheme<A>>) -> Option<Arc<LoadedTheme<A>>> {
        let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
        current.replace(theme)
    }

    fn retire(&self, previous: Arc<LoadedTheme<A>>) -> Option<PendingRelease> {
        let delay = self.config.release_delay;

        // スレッド起動に失敗した場合は解放せずに残す（使用中メモリの解放を避ける）
        let previous = ManuallyDrop::new(previous);
        let spawned = thread::Builder::new()
            .name(RELEASE_THREAD_NAME.to_owned())
            .spawn(move || {
                thread::sleep(delay);
                drop(ManuallyDrop::into_inner(previous));
            });

        match spawned {
            Ok(handle) => Some(PendingRelease { handle }),
            Err(e) => {
                tracing::error!("could not spawn theme release worker, leaking old theme: {e}");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{handles::SectionHandle, testing::MockThemeApi};

    const FAST: ThemeManagerConfig = ThemeManagerConfig {
        release_delay: Duration::from_millis(5),
    };

    fn manager(build: u32) -> ThemeManager<MockThemeApi> {
        ThemeManager::new(Arc::new(MockThemeApi::new(build)), FAST)
    }

    fn path() -> Vec<u16> {
        wide_path(Path::new("C:\\Windows\\Resources\\Themes\\aero\\aero.msstyles"))
    }

    fn current_sharable(m: &ThemeManager<MockThemeApi>) -> SectionHandle {
        m.snapshot().map(|t| t.file().sharable().0).unwrap_or(SectionHandle::NULL)
    }

    #[test]
    fn first_load_publishes_without_release() {
        let m = manager(22631);
        assert!(!m.is_loaded());

        let pending = m.load(&path()).unwrap();
        assert!(pending.is_none());
        assert!(m.is_loaded());
        assert_eq!(m.api().live_sections(), 2);
    }

    #[test]
    fn superseded_theme_is_released_once_after_delay() {
        let m = manager(22631);
        m.load(&path()).unwrap();
        let first = current_sharable(&m);

        let pending = m.load(&path()).unwrap().expect("old theme should be retired");
        let second = current_sharable(&m);
        assert_ne!(first, second);

        pending.wait();
        assert_eq!(m.api().close_count(first), 1);
        assert_eq!(m.api().close_count(second), 0);
        assert_eq!(m.api().live_sections(), 2);
        assert!(!m.api().any_double_close());
    }

    #[test]
    fn release_waits_for_in_flight_reader() {
        let m = manager(22631);
        m.load(&path()).unwrap();
        let reader = m.snapshot().unwrap();
        let first = reader.file().sharable().0;

        m.load(&path()).unwrap().unwrap().wait();
        assert_eq!(m.api().close_count(first), 0);

        drop(reader);
        assert_eq!(m.api().close_count(first), 1);
    }

    #[test]
    fn worker_frees_only_the_captured_instance() {
        let m = ThemeManager::new(
            Arc::new(MockThemeApi::new(22631)),
            ThemeManagerConfig {
                release_delay: Duration::from_millis(30),
            },
        );
        m.load(&path()).unwrap();
        let a = current_sharable(&m);
        let release_a = m.load(&path()).unwrap().unwrap();
        let b = current_sharable(&m);
        let release_b = m.load(&path()).unwrap().unwrap();
        let c = current_sharable(&m);

        release_a.wait();
        release_b.wait();
        assert_eq!(m.api().close_count(a), 1);
        assert_eq!(m.api().close_count(b), 1);
        assert_eq!(m.api().close_count(c), 0);
        assert_eq!(current_sharable(&m), c);
    }

    #[test]
    fn failed_defaults_keep_previous_theme() {
        let m = manager(22631);
        m.load(&path()).unwrap();
        let before = current_sharable(&m);

        let code = 0x8007_000B_u32 as i32;
        m.api().fail_defaults(Some(code));
        let err = m.load(&path()).unwrap_err();

        assert_eq!(err, ThemeError::InvalidThemeFile { code });
        assert_eq!(current_sharable(&m), before);
        assert_eq!(m.api().live_sections(), 2);
        assert!(m.api().abis().len() == 1, "loader must not run after defaults failure");
    }

    #[test]
    fn failed_section_load_keeps_previous_theme() {
        let m = manager(22631);
        m.load(&path()).unwrap();
        let before = current_sharable(&m);

        m.api().fail_load(Some(0x8000_4005_u32 as i32));
        let err = m.load(&path()).unwrap_err();

        assert!(matches!(err, ThemeError::ThemeLoadFailed { .. }));
        assert_eq!(current_sharable(&m), before);
        assert_eq!(m.api().live_sections(), 2);
        assert_eq!(m.api().map_count(), 2);
    }

    #[test]
    fn handles_returned_by_failed_loader_are_closed_once() {
        let m = manager(22631);
        m.load(&path()).unwrap();
        let before = current_sharable(&m);

        let code = 0x8007_000E_u32 as i32;
        m.api().fail_load_with_sections(Some(code));
        let err = m.load(&path()).unwrap_err();
        assert_eq!(err, ThemeError::ThemeLoadFailed { code });

        let leftover = m.api().last_failed_sections().expect("loader returned handles");
        assert_eq!(m.api().close_count(leftover.sharable), 1);
        assert_eq!(m.api().close_count(leftover.non_sharable), 1);
        assert_eq!(m.api().live_sections(), 2);
        assert_eq!(current_sharable(&m), before);
        assert_eq!(m.api().close_count(before), 0);
        assert_eq!(m.api().map_count(), 2);
    }

    #[test]
    fn failed_loader_with_one_handle_closes_only_that_one() {
        let m = manager(19041);
        m.api().fail_load_with_sections(Some(0x8000_4005_u32 as i32));
        m.api().fail_load_returning_only_sharable();
        assert!(m.load(&path()).is_err());

        let leftover = m.api().last_failed_sections().unwrap();
        assert!(leftover.non_sharable.is_null());
        assert_eq!(m.api().close_count(leftover.sharable), 1);
        assert_eq!(m.api().close_count(SectionHandle::NULL), 0);
        assert_eq!(m.api().live_sections(), 0);
        assert!(!m.is_loaded());
    }

    #[test]
    fn failed_first_load_leaves_nothing_loaded() {
        let m = manager(22631);
        m.api().fail_defaults(Some(0x8000_4005_u32 as i32));
        assert!(m.load(&path()).is_err());
        assert!(!m.is_loaded());
        assert_eq!(m.api().live_sections(), 0);
    }

    #[test]
    fn loader_shape_follows_build_boundary() {
        let legacy = manager(19999);
        legacy.load(&path()).unwrap();
        assert_eq!(legacy.api().abis(), vec![LoaderAbi::Legacy]);

        let modern = manager(20000);
        modern.load(&path()).unwrap();
        assert_eq!(modern.api().abis(), vec![LoaderAbi::Modern]);
    }

    #[test]
    fn hook_body_ignores_window_and_class_list() {
        let m = manager(22631);
        m.load(&path()).unwrap();
        let loaded = current_sharable(&m);

        let button: Vec<u16> = "BUTTON\0".encode_utf16().collect();
        let edit: Vec<u16> = "EDIT\0".encode_utf16().collect();
        let hwnd = WindowHandle(0x1234 as *mut std::ffi::c_void);

        let h1 = unsafe { m.open_theme_data(WindowHandle::NULL, button.as_ptr()) };
        let h2 = unsafe { m.open_theme_data(hwnd, edit.as_ptr()) };

        assert_eq!(h1, ThemeHandle(loaded.0 as isize));
        assert_eq!(h2, h1);

        let calls = m.api().open_calls();
        assert_eq!(calls.len(), 2);
        assert!(calls.iter().all(|c| c.sharable == loaded && c.flags == 0));
        assert_eq!(calls[0].class_list, "BUTTON");
        assert_eq!(calls[1].window, 0x1234);
        assert_eq!(calls[1].class_list, "EDIT");
    }

    #[test]
    fn hook_body_without_theme_returns_null() {
        let m = manager(22631);
        let handle = unsafe { m.open_theme_data(WindowHandle::NULL, std::ptr::null()) };
        assert!(handle.is_null());
        assert!(m.api().open_calls().is_empty());
    }

    #[test]
    fn unload_releases_immediately() {
        let m = manager(22631);
        m.load(&path()).unwrap();
        let loaded = current_sharable(&m);

        assert!(m.unload());
        assert_eq!(m.api().close_count(loaded), 1);
        assert!(!m.is_loaded());
        assert!(!m.unload());
    }

    #[test]
    fn concurrent_loads_publish_one_theme_and_release_the_rest() {
        let m = Arc::new(manager(22631));

        let workers: Vec<_> = (0..8)
            .map(|_| {
                let m = Arc::clone(&m);
                thread::spawn(move || m.load(&path()).unwrap())
            })
            .collect();

        for worker in workers {
            if let Some(pending) = worker.join().unwrap() {
                pending.wait();
            }
        }

        assert!(m.is_loaded());
        assert_eq!(m.api().live_sections(), 2);
        assert!(!m.api().any_double_close());
    }
}
