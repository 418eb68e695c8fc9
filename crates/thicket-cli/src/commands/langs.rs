pub fn run() {
    print!("{}", list());
}

pub fn list() -> String {
    let names = thicket_langs::names();
    let mut out = format!("Supported languages ({}):\n", names.len());
    for (name, lang) in names.iter().zip(thicket_langs::all()) {
        out.push_str(&format!("  {name} (abi {})\n", lang.version()));
    }
    out
}
