/*
============================================================================
restyle - uxtheme OpenThemeData フックDLL (lib.rs)
============================================================================

【概要】
ホストプロセスに読み込まれ、uxtheme!OpenThemeData をフックして、
OSが解決するテーマの代わりに呼び出し元が指定したテーマファイル（.msstyles）を
プロセス内の全コンポーネントへ返すライブラリ。

【レイヤー構成】（下位から）
1. version：OSビルド番号の取得と LoaderLoadTheme のABI形状判定
2. theme / theme_api / uxtheme / theme_manager：テーマリソース管理
3. hook：フック基盤の抽象化と OpenThemeData の置き換え
4. global_state / exports：プロセス全体の状態と C ABI

【使用方法】
ホストは起動時に LoadGlobalTheme(path) を一度呼び、続いて InitializeHooks() を呼ぶ。
以降、プロセス内の OpenThemeData 呼び出しは全て読み込んだテーマから返される。

【プラットフォーム】
Windows以外ではOS連携部分（uxtheme / hook::detour / global_state / exports）を含まない。
テーマ管理とフック管理の中核はモックOS層でテストできる。

============================================================================
*/

pub mod constants;
pub mod error;
pub mod handles;
pub mod hook;
pub mod theme;
pub mod theme_api;
pub mod theme_manager;
pub mod version;

#[cfg(windows)]
pub mod exports;
#[cfg(windows)]
pub mod global_state;
#[cfg(windows)]
pub mod uxtheme;

#[cfg(test)]
mod testing;

pub use error::{HookError, InitResult, ThemeError, UninitResult};
pub use theme_manager::{PendingRelease, ThemeManager, ThemeManagerConfig};
pub use version::{LoaderAbi, os_build_number};

#[cfg(windows)]
pub use global_state::{
    initialize_hooks, load_global_theme, original_open_theme_data, uninitialize,
    unload_global_theme,
};
