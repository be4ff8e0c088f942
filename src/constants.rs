/*
============================================================================
定数定義モジュール (constants.rs)
============================================================================

【ファイル概要】
uxtheme.dll / ntdll.dll の非公開エントリポイントに関する値と、
テーマ管理の既定値を一元管理するモジュール。

【重要な制約】
序数（ordinal）はWindowsのビルドごとに変わる可能性がある非公開ABI。
値を変更する場合は uxtheme.rs の関数型定義も同時に確認すること。

【定数カテゴリ】
1. DLL名・エクスポート名：GetModuleHandleW / GetProcAddress で使用
2. 非公開序数：uxtheme.dll の名前なしエクスポート
3. ABI境界：LoaderLoadTheme の引数形状が変わるビルド番号
4. テーマファイル構造：OS側が検証するヘッダー/トレーラーのタグ
5. 解放ポリシー：旧テーマの遅延解放時間

============================================================================
*/

use std::time::Duration;

// ===== DLL名・エクスポート名 =====
// ログ・エラー表示用（API呼び出しには windows::core の w!/s! リテラルを使う）
// テーマライブラリ：ホストプロセスで既にロード済みであることが前提
pub const UXTHEME_DLL: &str = "uxtheme.dll";
// カーネル低レベルライブラリ：RtlGetVersion の解決に使用
pub const NTDLL_DLL: &str = "ntdll.dll";
pub const RTL_GET_VERSION: &str = "RtlGetVersion";
// フック対象の公開API
pub const OPEN_THEME_DATA: &str = "OpenThemeData";

// ===== uxtheme.dll 非公開序数 =====
// GetThemeDefaults：既定のカラー名・サイズ名を取得
pub const ORDINAL_GET_THEME_DEFAULTS: u16 = 7;
// OpenThemeDataFromFile：読み込み済みテーマファイルからHTHEMEを生成
pub const ORDINAL_OPEN_THEME_DATA_FROM_FILE: u16 = 16;
// LoaderLoadTheme：テーマファイルを解析し共有/非共有セクションを作成
pub const ORDINAL_LOADER_LOAD_THEME: u16 = 92;

// ===== ABI境界 =====
// このビルド以降の LoaderLoadTheme は末尾の BOOL 引数を持たない
pub const MODERN_LOADER_MIN_BUILD: u32 = 20000;

// ===== テーマファイル構造 =====
pub const THEME_FILE_HEADER: [u8; 7] = *b"thmfile";
pub const THEME_FILE_TRAILER: [u8; 3] = *b"end";

// MapViewOfFile に渡すアクセス権（FILE_MAP_READ）
pub const SECTION_VIEW_ACCESS: u32 = 0x0004;

// GetThemeDefaults 用バッファ長（MAX_PATH）
pub const THEME_NAME_CAPACITY: usize = 260;

// ===== 解放ポリシー =====
// 置き換えられたテーマを解放するまでの待機時間
pub const THEME_RELEASE_DELAY: Duration = Duration::from_secs(1);
// 遅延解放ワーカースレッド名
pub const RELEASE_THREAD_NAME: &str = "restyle-theme-release";

// ===== HRESULT =====
pub const S_OK: i32 = 0;
pub const E_FAIL: i32 = 0x8000_4005_u32 as i32;
pub const E_POINTER: i32 = 0x8000_4003_u32 as i32;
