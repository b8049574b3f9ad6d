use super::*;

#[test]
fn cli_parse_fetch_defaults() {
    let cli = parse(&["kbin", "fetch", "--kube-version", "v1.21.5"]);
    assert!(cli.config.is_none());
    match cli.command {
        CliCommand::Fetch {
            kube_version,
            arches,
            kubesphere_version,
            json,
        } => {
            assert_eq!(kube_version, "v1.21.5");
            assert_eq!(arches, ["amd64"]);
            assert!(kubesphere_version.is_none());
            assert!(!json);
        }
        _ => panic!("expected Fetch"),
    }
}

#[test]
fn cli_parse_fetch_multi_arch_and_legacy() {
    let cli = parse(&[
        "kbin",
        "fetch",
        "--kube-version",
        "v1.21.5",
        "--arch",
        "amd64,arm64",
        "--kubesphere-version",
        "v2.1.1",
        "--json",
    ]);
    match cli.command {
        CliCommand::Fetch {
            arches,
            kubesphere_version,
            json,
            ..
        } => {
            assert_eq!(arches, ["amd64", "arm64"]);
            assert_eq!(kubesphere_version.as_deref(), Some("v2.1.1"));
            assert!(json);
        }
        _ => panic!("expected Fetch"),
    }
}

#[test]
fn cli_parse_fetch_requires_kube_version() {
    assert!(Cli::try_parse_from(["kbin", "fetch"]).is_err());
}

#[test]
fn cli_parse_global_config() {
    let cli = parse(&[
        "kbin",
        "fetch",
        "--kube-version",
        "v1.22.1",
        "--config",
        "/etc/kbin.toml",
    ]);
    assert_eq!(cli.config.as_deref(), Some(std::path::Path::new("/etc/kbin.toml")));
}
