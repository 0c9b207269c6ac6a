use tracing::info;

use crate::config::Settings;
use crate::error::AppError;
use crate::services::heap_options::build_heap_options;

pub const TLS_OVERRIDE_OPT: &str = "-Dcom.ibm.jsse2.overrideDefaultTLS=true";
pub const VIRTUALIZED_TUNING_OPT: &str = "-Xtune:virtualized";
pub const SHARED_CLASSES_OFF_OPT: &str = "-Xshareclasses:none";

/// Assemble the full JVM option list: fixed flags, the heap size derived
/// from the memory limit, then any user supplied extras.
pub fn java_options(settings: &Settings) -> Result<Vec<String>, AppError> {
    let mut opts = vec![
        TLS_OVERRIDE_OPT.to_string(),
        format!("-Djava.io.tmpdir={}", settings.tmp_dir),
        VIRTUALIZED_TUNING_OPT.to_string(),
        SHARED_CLASSES_OFF_OPT.to_string(),
    ];

    let heap = build_heap_options(settings.memory_limit.as_ref(), settings.heap_ratio()?)?;
    match heap.first() {
        Some(flag) => info!("Heap size set with {}", flag),
        None => info!("MEMORY_LIMIT not set, using the JVM default heap size"),
    }
    opts.extend(heap);

    if let Some(extra) = &settings.extra_opts {
        opts.extend(extra.split_whitespace().map(String::from));
    }

    Ok(opts)
}

pub fn render(opts: &[String]) -> String {
    opts.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::heap_options::MemoryLimit;

    #[test]
    fn heap_flag_follows_fixed_options() {
        let settings = Settings {
            memory_limit: Some(MemoryLimit::from("512m")),
            tmp_dir: "/home/vcap/tmp".into(),
            extra_opts: Some("-XX:+UseG1GC  -verbose:gc".into()),
            ..Settings::default()
        };

        let opts = java_options(&settings).unwrap();
        assert_eq!(
            opts,
            vec![
                "-Dcom.ibm.jsse2.overrideDefaultTLS=true",
                "-Djava.io.tmpdir=/home/vcap/tmp",
                "-Xtune:virtualized",
                "-Xshareclasses:none",
                "-Xmx384M",
                "-XX:+UseG1GC",
                "-verbose:gc",
            ]
        );
    }

    #[test]
    fn no_heap_flag_without_memory_limit() {
        let opts = java_options(&Settings::default()).unwrap();
        assert_eq!(opts.len(), 4);
        assert!(opts.iter().all(|o| !o.starts_with("-Xmx")));
    }

    #[test]
    fn configured_ratio_is_applied() {
        let settings = Settings {
            memory_limit: Some(MemoryLimit::from("1g")),
            heap_ratio: Some("0.5".into()),
            ..Settings::default()
        };
        let opts = java_options(&settings).unwrap();
        assert!(opts.contains(&"-Xmx512M".to_string()));
    }

    #[test]
    fn bad_memory_limit_aborts() {
        let settings = Settings {
            memory_limit: Some(MemoryLimit::from("5x")),
            ..Settings::default()
        };
        assert!(java_options(&settings).is_err());
    }

    #[test]
    fn render_joins_with_spaces() {
        let opts = vec!["-Xmx1G".to_string(), "-Xtune:virtualized".to_string()];
        assert_eq!(render(&opts), "-Xmx1G -Xtune:virtualized");
    }
}
