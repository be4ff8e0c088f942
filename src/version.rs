/*
============================================================================
OSバージョン判定モジュール (version.rs)
============================================================================

【ファイル概要】
実行中のWindowsのビルド番号を取得し、LoaderLoadTheme の
どちらのABI形状で呼び出すべきかを判定する。

【主要機能】
1. os_build_number：ntdll!RtlGetVersion を名前で解決して取得（初回のみ、結果はキャッシュ）
2. LoaderAbi::classify：ビルド番号 → Legacy / Modern

【エラーハンドリング】
RtlGetVersion が解決できない環境では 0 を返す。
0 は「最も古いABI」として扱われるため、エラーは発生させない。

============================================================================
*/

use once_cell::sync::Lazy;

use crate::constants::MODERN_LOADER_MIN_BUILD;

/// LoaderLoadTheme の呼び出し形状
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoaderAbi {
    /// ビルド 20000 未満：末尾に BOOL fEmulateGlobal を取る
    Legacy,
    /// ビルド 20000 以降：末尾の BOOL 引数なし
    Modern,
}

impl LoaderAbi {
    pub fn classify(build_number: u32) -> LoaderAbi {
        if build_number >= MODERN_LOADER_MIN_BUILD {
            LoaderAbi::Modern
        } else {
            LoaderAbi::Legacy
        }
    }
}

// ビルド番号は実行中に変わらないためプロセス寿命の間キャッシュする
static OS_BUILD_NUMBER: Lazy<u32> = Lazy::new(query_build_number);

/// 実行中OSのビルド番号（取得できなければ 0）
pub fn os_build_number() -> u32 {
    *OS_BUILD_NUMBER
}

#[cfg(windows)]
fn query_build_number() -> u32 {
    use windows::{
        Win32::System::{
            LibraryLoader::{GetModuleHandleW, GetProcAddress},
            SystemInformation::OSVERSIONINFOEXW,
        },
        core::{s, w},
    };

    use crate::constants::{NTDLL_DLL, RTL_GET_VERSION};

    type RtlGetVersionFn = unsafe extern "system" fn(*mut OSVERSIONINFOEXW) -> i32;

    unsafe {
        let Ok(ntdll) = GetModuleHandleW(w!("ntdll.dll")) else {
            tracing::debug!("{} is not loaded, assuming build 0", NTDLL_DLL);
            return 0;
        };
        let Some(proc) = GetProcAddress(ntdll, s!("RtlGetVersion")) else {
            tracing::debug!("{} is not exported, assuming build 0", RTL_GET_VERSION);
            return 0;
        };
        let rtl_get_version: RtlGetVersionFn = std::mem::transmute(proc);

        let mut info: OSVERSIONINFOEXW = std::mem::zeroed();
        info.dwOSVersionInfoSize = std::mem::size_of::<OSVERSIONINFOEXW>() as u32;
        let status = rtl_get_version(&mut info);
        if status < 0 {
            tracing::warn!("RtlGetVersion failed (status=0x{status:08X})");
            return 0;
        }

        tracing::debug!(
            "OS version {}.{} build {}",
            info.dwMajorVersion,
            info.dwMinorVersion,
            info.dwBuildNumber
        );
        info.dwBuildNumber
    }
}

#[cfg(not(windows))]
fn query_build_number() -> u32 {
    0
}
