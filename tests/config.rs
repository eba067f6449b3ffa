use std::env;
use std::time::Duration;
use tetl::{EtlOptions, Floor, LookupCfg, RateLimitCfg};

const VARS: [&str; 3] = ["TETL_REQUEST_CEILING", "TETL_COOLDOWN_SECS", "TETL_BATCH_DELAY_MS"];

fn clear() {
    for v in VARS {
        env::remove_var(v);
    }
}

/// Environment overrides, in one test since the variables are process-wide:
/// - unset variables leave the defaults alone
/// - valid values replace the ceiling, cooldown and lookup delay
/// - a zero ceiling is clamped to 1
/// - unparseable values are ignored and the previous setting kept
#[test]
fn env_overrides() {
    clear();
    let base = EtlOptions::default().apply_env_overrides();
    assert_eq!(base.rate_limit, RateLimitCfg { request_ceiling: 450, cooldown: Duration::from_secs(900) });
    assert_eq!(base.lookup, LookupCfg { batch_size: 100, batch_delay: Duration::from_secs(1) });

    env::set_var("TETL_REQUEST_CEILING", "12");
    env::set_var("TETL_COOLDOWN_SECS", " 30 ");
    env::set_var("TETL_BATCH_DELAY_MS", "250");
    let opts = EtlOptions::default().apply_env_overrides();
    assert_eq!(opts.rate_limit.request_ceiling, 12);
    assert_eq!(opts.rate_limit.cooldown, Duration::from_secs(30));
    assert_eq!(opts.lookup.batch_delay, Duration::from_millis(250));
    assert_eq!(opts.lookup.batch_size, 100);

    env::set_var("TETL_REQUEST_CEILING", "0");
    assert_eq!(EtlOptions::default().apply_env_overrides().rate_limit.request_ceiling, 1);

    env::set_var("TETL_REQUEST_CEILING", "lots");
    env::set_var("TETL_COOLDOWN_SECS", "-5");
    env::set_var("TETL_BATCH_DELAY_MS", "1.5s");
    let kept = EtlOptions::default().with_rate_limit(7, Duration::from_secs(2)).apply_env_overrides();
    assert_eq!(kept.rate_limit, RateLimitCfg { request_ceiling: 7, cooldown: Duration::from_secs(2) });
    assert_eq!(kept.lookup.batch_delay, Duration::from_secs(1));

    clear();
}

#[test]
fn builders_clamp_sizes() {
    let opts = EtlOptions::default()
        .with_rate_limit(0, Duration::ZERO)
        .with_lookup(0, Duration::ZERO)
        .with_floor(10, 4)
        .with_total_to_collect(0);
    assert_eq!(opts.rate_limit.request_ceiling, 1);
    assert_eq!(opts.lookup.batch_size, 1);
    assert_eq!(opts.floor, Floor { low: 10, high: 10 });
    assert_eq!(opts.total_to_collect, 1);
    assert!(!opts.allow_skipped_rows);
    assert_eq!(opts.sync_destination(), opts.save_location.as_path());
}
