use std::{env, fs, path::PathBuf};

fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-env-changed=OUT_DIR");

    let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap());
    let completions_dir = out_dir.join("completions");

    fs::create_dir_all(&completions_dir).unwrap();

    let mut cmd = clap::Command::new("xtractor")
        .version(env!("CARGO_PKG_VERSION"))
        .author("X-Tractor Contributors")
        .about("Save X posts, Medium stories and web articles")
        .arg(clap::arg!([INPUT] "URL to extract, local HTML file, or '-' for stdin"))
        .arg(
            clap::arg!(-o --output <FILE> "Output file (default: stdout)")
                .value_parser(clap::value_parser!(std::path::PathBuf)),
        )
        .arg(
            clap::arg!(-f --format <FORMAT> "Output format (html, markdown)")
                .default_value("html")
                .value_parser(["html", "markdown", "md"]),
        )
        .arg(
            clap::arg!(--source <SOURCE> "Force a strategy instead of detecting it")
                .value_parser(["x", "medium", "generic"]),
        )
        .arg(clap::arg!(--url <URL> "Page URL for file or stdin input, used to resolve relative links"))
        .arg(clap::arg!(--timeout <SECS> "HTTP timeout in seconds").default_value("30"))
        .arg(clap::arg!(--"user-agent" <UA> "Custom User-Agent for HTTP requests"))
        .arg(clap::arg!(--concurrency <NUM> "Image downloads in flight").default_value("4"))
        .arg(
            clap::arg!(--session <FILE> "Cookie file (default: ~/.x-tractor-cookies.json)")
                .value_parser(clap::value_parser!(std::path::PathBuf)),
        )
        .arg(clap::arg!(--"no-inline" "Keep remote image URLs instead of embedding them"))
        .arg(clap::arg!(--"check-session" "Report whether a saved session exists and how old it is"))
        .arg(
            clap::arg!(--"import-cookies" <FILE> "Store a browser cookie export as the saved session")
                .value_parser(clap::value_parser!(std::path::PathBuf)),
        )
        .arg(clap::arg!(--json "Emit the artifact and the run report as one JSON object"))
        .arg(clap::arg!(-v --verbose "Enable debug logging"));

    for shell in [
        clap_complete::Shell::Bash,
        clap_complete::Shell::Zsh,
        clap_complete::Shell::Fish,
        clap_complete::Shell::PowerShell,
    ] {
        clap_complete::generate_to(shell, &mut cmd, "xtractor", &completions_dir).unwrap();
    }

    println!(
        "cargo:warning=Shell completions generated in: {}",
        completions_dir.display()
    );
}
