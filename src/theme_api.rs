/*
============================================================================
テーマOS層インターフェースモジュール (theme_api.rs)
============================================================================

【ファイル概要】
uxtheme.dll の非公開エントリポイントとセクション操作を、型付きの
トレイト `ThemeApi` として抽象化する。非公開ABIの知識は実装側
（Windowsでは uxtheme.rs）に閉じ込め、テーマ管理側は型付き操作のみに依存する。

【主要機能】
1. theme_defaults：既定カラー名/サイズ名の取得（序数7）
2. load_sections：テーマ解析とセクション作成（序数92、ABI形状は呼び出し側が選択）
3. map_section / unmap_view / close_section：セクションのマップと解放
4. open_theme_data_from_file：読み込み済みテーマからHTHEME生成（序数16）
5. load_raw_path：C ABI のパス引数（null チェック込み）を HRESULT に変換

【AI解析用：依存関係】
- theme_manager.rs：ThemeManager<A: ThemeApi> として注入される
- uxtheme.rs：Windows実装
- testing.rs：テスト用モック実装

============================================================================
*/

use std::path::Path;

use crate::{
    constants::E_POINTER,
    error::{ThemeError, theme_result_to_hresult},
    handles::{SectionHandle, SectionPair, SectionView, ThemeHandle, WindowHandle},
    theme::ThemeFile,
    version::LoaderAbi,
};

/// GetThemeDefaults の結果（どちらも null 終端のUTF-16）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThemeDefaults {
    pub color_name: Vec<u16>,
    pub size_name: Vec<u16>,
}

/// LoaderLoadTheme の失敗
///
/// 失敗時でもローダーがセクションを返していることがあるため、
/// そのハンドルを `sections` に載せて呼び出し側で閉じさせる。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoaderFailure {
    pub error: ThemeError,
    pub sections: SectionPair,
}

impl From<ThemeError> for LoaderFailure {
    fn from(error: ThemeError) -> Self {
        LoaderFailure {
            error,
            sections: SectionPair::NULL,
        }
    }
}

/// テーマ読み込みに必要なOS操作の集合
pub trait ThemeApi: Send + Sync + 'static {
    /// 実行中OSのビルド番号（不明なら 0）
    fn build_number(&self) -> u32;

    /// `path` は null 終端のUTF-16
    fn theme_defaults(&self, path: &[u16]) -> Result<ThemeDefaults, ThemeError>;

    /// 失敗時に返されたハンドルは閉じずに `LoaderFailure` で返す
    fn load_sections(
        &self,
        abi: LoaderAbi,
        path: &[u16],
        defaults: &ThemeDefaults,
    ) -> Result<SectionPair, LoaderFailure>;

    /// マップ失敗時は `SectionView::NULL`
    fn map_section(&self, section: SectionHandle) -> SectionView;

    fn unmap_view(&self, view: SectionView);

    fn close_section(&self, section: SectionHandle);

    /// # Safety
    /// `class_list` は null か、呼び出し中有効な null 終端UTF-16であること。
    unsafe fn open_theme_data_from_file(
        &self,
        theme: &ThemeFile,
        window: WindowHandle,
        class_list: *const u16,
        flags: u32,
    ) -> ThemeHandle;
}

/// パスを null 終端のUTF-16に変換する
#[cfg(windows)]
pub fn wide_path(path: &Path) -> Vec<u16> {
    use std::os::windows::ffi::OsStrExt;

    path.as_os_str()
        .encode_wide()
        .chain(std::iter::once(0))
        .collect()
}

/// パスを null 終端のUTF-16に変換する
#[cfg(not(windows))]
pub fn wide_path(path: &Path) -> Vec<u16> {
    path.to_string_lossy()
        .encode_utf16()
        .chain(std::iter::once(0))
        .collect()
}

/// null 終端のUTF-16ポインタをスライスとして読む（終端を含む）
///
/// # Safety
/// `ptr` は null でなく、null 終端の有効なUTF-16を指していること。
pub unsafe fn wide_from_ptr<'a>(ptr: *const u16) -> &'a [u16] {
    let mut len = 0;
    unsafe {
        while *ptr.add(len) != 0 {
            len += 1;
        }
        std::slice::from_raw_parts(ptr, len + 1)
    }
}

/// C ABI から渡されたパスで `load` を実行し、HRESULT を返す
///
/// `path` が null なら `load` を呼ばずに E_POINTER。
///
/// # Safety
/// `path` は null か、null 終端の有効なUTF-16を指していること。
pub unsafe fn load_raw_path(path: *const u16, load: impl FnOnce(&[u16]) -> Result<(), ThemeError>) -> i32 {
    if path.is_null() {
        return E_POINTER;
    }
    let path = unsafe { wide_from_ptr(path) };
    theme_result_to_hresult(&load(path))
}

/// null 終端を除いたUTF-16を文字列化する（ログ用）
pub fn wide_to_string(wide: &[u16]) -> String {
    let len = wide.iter().position(|&c| c == 0).unwrap_or(wide.len());
    String::from_utf16_lossy(&wide[..len])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wide_path_is_nul_terminated() {
        let wide = wide_path(Path::new("aero.msstyles"));
        assert_eq!(wide.last(), Some(&0));
        assert_eq!(wide_to_string(&wide), "aero.msstyles");
    }

    #[test]
    fn wide_from_ptr_includes_terminator() {
        let source: Vec<u16> = "BUTTON".encode_utf16().chain(std::iter::once(0)).collect();
        let read = unsafe { wide_from_ptr(source.as_ptr()) };
        assert_eq!(read, source.as_slice());
    }

    #[test]
    fn null_raw_path_is_e_pointer_without_loading() {
        let mut called = false;
        let hr = unsafe {
            load_raw_path(std::ptr::null(), |_| {
                called = true;
                Ok(())
            })
        };
        assert_eq!(hr, E_POINTER);
        assert!(!called);
    }

    #[test]
    fn raw_path_reaches_loader_and_maps_its_result() {
        use crate::constants::S_OK;

        let source = wide_path(Path::new("aero.msstyles"));
        let mut seen = Vec::new();
        let hr = unsafe {
            load_raw_path(source.as_ptr(), |path| {
                seen = path.to_vec();
                Ok(())
            })
        };
        assert_eq!(hr, S_OK);
        assert_eq!(seen, source);

        let code = 0x8007_0002_u32 as i32;
        let hr = unsafe { load_raw_path(source.as_ptr(), |_| Err(ThemeError::InvalidThemeFile { code })) };
        assert_eq!(hr, code);
    }
}
