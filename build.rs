use std::io::{Error, ErrorKind};
use std::process::Command;

fn main() {
    // Obtain cargo pkg version as app version.
    let package_version: String = option_env!("CARGO_PKG_VERSION")
        .unwrap_or("(Unknown Cargo package version)")
        .to_string();

    // Obtain build infomation from Git.
    let build_info: String =
        from_git().unwrap_or_else(|_| "(Build info from Git not present)".into());

    println!("cargo:rustc-env=STREETPRESS_VERSION={}", package_version);
    println!("cargo:rustc-env=BUILD_INFO={}", build_info);
    println!("cargo:rerun-if-changed=templates");
    println!("cargo:rerun-if-changed=static");
    println!("cargo:rerun-if-changed=locales");
}

fn run(args: &[&str]) -> Result<String, std::io::Error> {
    let out = Command::new(args[0]).args(&args[1..]).output()?;
    match out.status.success() {
        true => String::from_utf8(out.stdout)
            .map(|s| s.trim().to_string())
            .map_err(|err| Error::new(ErrorKind::InvalidData, err)),
        false => Err(Error::new(ErrorKind::Other, "Command not successful.")),
    }
}

fn from_git() -> Result<String, std::io::Error> {
    // Read the current git commit hash
    let rev = run(&["git", "rev-parse", "--verify", "--short", "HEAD"])?;
    println!("cargo:rustc-env=GIT_REV={}", rev);

    // Read the current branch name.
    let branch = run(&["git", "rev-parse", "--abbrev-ref", "HEAD"])?;
    println!("cargo:rustc-env=GIT_BRANCH={}", branch);

    Ok(format!(
        "build branch in \"{}\", lasted commit id: {}",
        branch, rev
    ))
}
