fn main() {
    if std::env::var("TARGET").unwrap().contains("windows") {
        // winresでDLLのバージョンリソースを埋め込む
        let mut res = winres::WindowsResource::new();
        res.set("FileDescription", "restyle uxtheme hook")
            .set("ProductName", "restyle")
            .set_language(0x0411) // 日本語
            .compile()
            .unwrap();

        println!("cargo:rerun-if-changed=build.rs");
    }
}
