//! The built-in project layout: module groups, artifacts, features.
//!
//! This is data, not logic; the composition rules live in the parent
//! module and in `ops::configure`.

use super::{ArtifactRegistry, FeatureAdditions, ModuleRegistry, RegistryError, SourceFile};

/// Candidate warning-suppression flags, kept only when the compiler
/// recognizes them.
pub const CANDIDATE_WARNINGS: &[&str] = &[
    "-Wno-mismatched-tags", // clang-only
];

/// Libraries linked into every artifact.
pub const BASE_LIBS: &[&str] = &[
    "-laio",
    "-lboost_program_options",
    "-lboost_system",
    "-lstdc++",
    "-lm",
    "-lboost_unit_test_framework",
    "-lboost_thread",
    "-lcryptopp",
];

const HWLOC_LIBS: &[&str] = &["-lhwloc", "-lnuma", "-lpciaccess", "-lxml2", "-lz"];

/// Libraries pulled in by `--dpdk-target`, linked after `-L<target>/lib`.
pub const DPDK_LIBS: &[&str] = &[
    "-Wl,--whole-archive",
    "-lrte_pmd_bond",
    "-lrte_pmd_vmxnet3_uio",
    "-lrte_pmd_virtio_uio",
    "-lrte_pmd_i40e",
    "-lrte_pmd_ixgbe",
    "-lrte_pmd_e1000",
    "-lrte_pmd_ring",
    "-Wl,--no-whole-archive",
    "-lrte_distributor",
    "-lrte_kni",
    "-lrte_pipeline",
    "-lrte_table",
    "-lrte_port",
    "-lrte_timer",
    "-lrte_hash",
    "-lrte_lpm",
    "-lrte_power",
    "-lrte_acl",
    "-lrte_meter",
    "-lrte_sched",
    "-lrte_kvargs",
    "-lrte_mbuf",
    "-lrte_ip_frag",
    "-lethdev",
    "-lrte_eal",
    "-lrte_malloc",
    "-lrte_mempool",
    "-lrte_ring",
    "-lrte_cmdline",
    "-lrte_cfgfile",
    "-lrt",
    "-lm",
    "-ldl",
];

const LIBNET: &[&str] = &[
    "net/proxy.cc",
    "net/virtio.cc",
    "net/dpdk.cc",
    "net/net.cc",
    "net/ip.cc",
    "net/ethernet.cc",
    "net/arp.cc",
    "net/native-stack.cc",
    "net/ip_checksum.cc",
    "net/udp.cc",
    "net/tcp.cc",
    "net/dhcp.cc",
];

const CORE: &[&str] = &[
    "core/reactor.cc",
    "core/posix.cc",
    "core/memory.cc",
    "core/resource.cc",
    "core/scollectd.cc",
    "core/app-template.cc",
    "core/dpdk_rte.cc",
    "util/conversions.cc",
    "net/packet.cc",
    "net/posix-stack.cc",
];

const APPS: &[(&str, &str, &[&str])] = &[
    ("apps/httpd/httpd", "apps/httpd/httpd.cc", &["httpd"]),
    ("apps/seastar/seastar", "apps/seastar/main.cc", &["core"]),
    (
        "apps/memcached/memcached",
        "apps/memcached/memcached.cc",
        &["memcache"],
    ),
    (
        "apps/memcached/flashcached",
        "apps/memcached/flashcached.cc",
        &["memcache"],
    ),
];

const TESTS: &[(&str, &str, &[&str])] = &[
    ("tests/test-reactor", "tests/test-reactor.cc", &["core"]),
    ("tests/fileiotest", "tests/fileiotest.cc", &["core"]),
    ("tests/echotest", "tests/echotest.cc", &["core", "libnet"]),
    ("tests/l3_test", "tests/l3_test.cc", &["core", "libnet"]),
    ("tests/ip_test", "tests/ip_test.cc", &["core", "libnet"]),
    ("tests/timertest", "tests/timertest.cc", &["core"]),
    ("tests/tcp_test", "tests/tcp_test.cc", &["core", "libnet"]),
    ("tests/futures_test", "tests/futures_test.cc", &["core"]),
    ("tests/udp_server", "tests/udp_server.cc", &["core", "libnet"]),
    ("tests/udp_client", "tests/udp_client.cc", &["core", "libnet"]),
    ("tests/blkdiscard_test", "tests/blkdiscard_test.cc", &["core"]),
    ("tests/sstring_test", "tests/sstring_test.cc", &["core"]),
    (
        "tests/memcached/test_ascii_parser",
        "tests/memcached/test_ascii_parser.cc",
        &["memcache_base"],
    ),
    ("tests/tcp_server", "tests/tcp_server.cc", &["core", "libnet"]),
    ("tests/tcp_client", "tests/tcp_client.cc", &["core", "libnet"]),
    ("tests/allocator_test", "tests/allocator_test.cc", &["allocator_test_deps"]),
    (
        "tests/output_stream_test",
        "tests/output_stream_test.cc",
        &["core", "libnet"],
    ),
    ("tests/udp_zero_copy", "tests/udp_zero_copy.cc", &["core", "libnet"]),
];

/// An optional feature: a header-availability probe plus what activating
/// it contributes to the configuration.
pub struct FeatureDef {
    pub name: &'static str,
    /// Headers whose compilability stands in for feature availability.
    pub headers: &'static [&'static str],
    pub note: &'static str,
    pub missing: &'static str,
    pub additions: fn() -> FeatureAdditions,
}

/// The optional features this project knows about, in resolution order.
pub fn features() -> Vec<FeatureDef> {
    vec![
        FeatureDef {
            name: "xen",
            headers: &[
                "stdint.h",
                "xen/xen.h",
                "xen/sys/evtchn.h",
                "xen/sys/gntdev.h",
                "xen/sys/gntalloc.h",
            ],
            note: "Note: xen-devel not installed.  No Xen support.",
            missing: "required package xen-devel not installed",
            additions: xen_additions,
        },
        FeatureDef {
            name: "hwloc",
            headers: &["hwloc.h", "numa.h"],
            note: "Note: hwloc-devel/numactl-devel not installed.  No NUMA support.",
            missing: "required packages hwloc-devel/numactl-devel not installed",
            additions: hwloc_additions,
        },
    ]
}

fn xen_additions() -> FeatureAdditions {
    FeatureAdditions {
        sources: vec![
            (
                "libnet".to_string(),
                vec![SourceFile::compiled("net/xenfront.cc")],
            ),
            (
                "core".to_string(),
                vec![
                    SourceFile::compiled("core/xen/xenstore.cc"),
                    SourceFile::compiled("core/xen/gntalloc.cc"),
                    SourceFile::compiled("core/xen/evtchn.cc"),
                ],
            ),
        ],
        defines: vec!["HAVE_XEN".to_string()],
        libs: vec!["-lxenstore".to_string()],
    }
}

fn hwloc_additions() -> FeatureAdditions {
    FeatureAdditions {
        sources: vec![],
        defines: vec!["HAVE_HWLOC".to_string(), "HAVE_NUMA".to_string()],
        libs: HWLOC_LIBS.iter().map(|l| l.to_string()).collect(),
    }
}

/// Register the base groups that feature resolution may extend.
pub fn register_base_groups(modules: &mut ModuleRegistry) -> Result<(), RegistryError> {
    modules.define("libnet", LIBNET)?;
    modules.define("core", CORE)?;
    Ok(())
}

/// Register the composite groups. Must run after feature resolution so
/// the composites capture any feature-added sources.
pub fn register_composites(modules: &mut ModuleRegistry) -> Result<(), RegistryError> {
    modules.define_composite("httpd", &["apps/httpd/request_parser.rl"], &["libnet", "core"])?;
    modules.define_composite(
        "memcache_base",
        &["apps/memcached/ascii.rl"],
        &["libnet", "core"],
    )?;
    modules.define_composite("memcache", &["apps/memcached/memcache.cc"], &["memcache_base"])?;
    modules.define_composite(
        "allocator_test_deps",
        &["core/memory.cc", "core/posix.cc"],
        &[],
    )?;
    Ok(())
}

/// Names of every built-in artifact, apps first then tests.
pub fn artifact_names() -> Vec<&'static str> {
    APPS.iter().chain(TESTS).map(|&(name, _, _)| name).collect()
}

/// Register every built-in artifact, apps first then tests.
pub fn register_artifacts(
    artifacts: &mut ArtifactRegistry,
    modules: &ModuleRegistry,
) -> Result<(), RegistryError> {
    for &(name, entry, groups) in APPS.iter().chain(TESTS) {
        artifacts.register(name, &[entry], groups, modules)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::SourceKind;

    fn default_registries() -> (ModuleRegistry, ArtifactRegistry) {
        let mut modules = ModuleRegistry::new();
        register_base_groups(&mut modules).unwrap();
        register_composites(&mut modules).unwrap();
        modules.freeze();

        let mut artifacts = ArtifactRegistry::new();
        register_artifacts(&mut artifacts, &modules).unwrap();
        (modules, artifacts)
    }

    #[test]
    fn test_default_layout_registers() {
        let (_, artifacts) = default_registries();
        assert_eq!(artifacts.names().count(), 22);
        assert!(artifacts.contains("apps/memcached/memcached"));
        assert!(artifacts.contains("tests/udp_zero_copy"));
    }

    #[test]
    fn test_memcached_artifacts_share_codegen_source() {
        let (_, artifacts) = default_registries();

        for name in ["apps/memcached/memcached", "apps/memcached/flashcached"] {
            let codegen: Vec<_> = artifacts
                .sources(name)
                .unwrap()
                .iter()
                .filter(|s| s.kind == SourceKind::Codegen)
                .map(|s| s.path.clone())
                .collect();
            assert_eq!(codegen.len(), 1, "{name}");
            assert_eq!(codegen[0].to_str().unwrap(), "apps/memcached/ascii.rl");
        }
    }

    #[test]
    fn test_entry_point_comes_first() {
        let (_, artifacts) = default_registries();
        let sources = artifacts.sources("apps/seastar/seastar").unwrap();
        assert_eq!(sources[0].path.to_str().unwrap(), "apps/seastar/main.cc");
    }

    #[test]
    fn test_feature_additions_target_known_groups() {
        let mut modules = ModuleRegistry::new();
        register_base_groups(&mut modules).unwrap();

        for feature in features() {
            let additions = (feature.additions)();
            additions.apply_sources(&mut modules).unwrap();
        }
        // xen appends to both base groups
        assert!(modules
            .get("core")
            .unwrap()
            .iter()
            .any(|s| s.path.to_str() == Some("core/xen/evtchn.cc")));
        assert!(modules
            .get("libnet")
            .unwrap()
            .iter()
            .any(|s| s.path.to_str() == Some("net/xenfront.cc")));
    }

    #[test]
    fn test_composites_capture_feature_sources() {
        let mut modules = ModuleRegistry::new();
        register_base_groups(&mut modules).unwrap();
        (features()[0].additions)().apply_sources(&mut modules).unwrap();
        register_composites(&mut modules).unwrap();
        modules.freeze();

        // memcache_base was composed after the xen append, so it sees it.
        assert!(modules
            .get("memcache_base")
            .unwrap()
            .iter()
            .any(|s| s.path.to_str() == Some("net/xenfront.cc")));
    }
}
