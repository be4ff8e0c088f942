/*
============================================================================
OSハンドルWrapperモジュール (handles.rs)
============================================================================

【ファイル概要】
セクションハンドル・マップ済みビュー・ウィンドウハンドル・テーマハンドルを
プラットフォーム非依存の newtype として定義する。

【設計目的】
生ポインタは Send/Sync 未実装のため、テーマオブジェクトを Arc で
スレッド間共有できない。プロセス全体で有効なハンドルに限り
明示的な unsafe 実装で共有を許可する。

【AI解析用：依存関係】
- theme.rs：ThemeFile のフィールド型として使用（#[repr(transparent)] でレイアウト不変）
- theme_api.rs：OS層とのやり取りの引数・戻り値
- uxtheme.rs：windows crate の HANDLE 等との相互変換

============================================================================
*/

use std::ffi::c_void;

/// 【SectionHandle】共有メモリセクションのハンドル
///
/// CloseHandle されるまでプロセス内のどのスレッドからでも有効。
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SectionHandle(pub *mut c_void);
unsafe impl Send for SectionHandle {}
unsafe impl Sync for SectionHandle {}

impl SectionHandle {
    pub const NULL: SectionHandle = SectionHandle(std::ptr::null_mut());

    pub fn is_null(&self) -> bool {
        self.0.is_null()
    }
}

/// 【SectionView】MapViewOfFile で得た読み取り専用ビュー
///
/// マップ失敗時は null。null でもセクションハンドル側は閉じる必要がある。
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SectionView(pub *mut c_void);
unsafe impl Send for SectionView {}
unsafe impl Sync for SectionView {}

impl SectionView {
    pub const NULL: SectionView = SectionView(std::ptr::null_mut());

    pub fn is_null(&self) -> bool {
        self.0.is_null()
    }
}

/// 【WindowHandle】フック呼び出し元から渡される HWND（素通しのみ）
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowHandle(pub *mut c_void);

impl WindowHandle {
    pub const NULL: WindowHandle = WindowHandle(std::ptr::null_mut());
}

/// 【ThemeHandle】OpenThemeData 系が返す HTHEME
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThemeHandle(pub isize);

impl ThemeHandle {
    /// OpenThemeData の失敗値
    pub const NULL: ThemeHandle = ThemeHandle(0);

    pub fn is_null(&self) -> bool {
        self.0 == 0
    }
}

/// 【SectionPair】LoaderLoadTheme が返す二つのセクション
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectionPair {
    pub sharable: SectionHandle,
    pub non_sharable: SectionHandle,
}

impl SectionPair {
    pub const NULL: SectionPair = SectionPair {
        sharable: SectionHandle::NULL,
        non_sharable: SectionHandle::NULL,
    };
}
