use chrono::{DateTime, TimeZone, Utc};

use chanlyze::{Direction, Endpoint, Mark, find_pivots};

fn dt(i: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2020, 7, 1, 9, 30, 0).unwrap() + chrono::Duration::minutes(i * 15)
}

fn ep(i: i64, mark: Mark, value: f64) -> Endpoint {
    Endpoint {
        dt: dt(i),
        mark,
        value,
    }
}

#[test]
fn breakout_above_the_pivot_range_emits_a_third_buy() {
    let points = vec![
        ep(0, Mark::D, 10.0),
        ep(1, Mark::G, 11.0),
        ep(2, Mark::D, 9.5),
        ep(3, Mark::G, 11.5),
        ep(4, Mark::D, 10.5),
        ep(5, Mark::G, 12.0),
        ep(6, Mark::D, 11.2),
    ];

    let pivots = find_pivots(&points);
    assert_eq!(pivots.len(), 1);

    let zs = &pivots[0];
    assert_eq!(zs.zd, 10.0);
    assert_eq!(zs.zg, 11.0);
    assert!(zs.zd < zs.zg);
    assert_eq!(zs.g, 11.0);
    assert_eq!(zs.gg, 12.0);
    assert_eq!(zs.d, 10.5);
    assert_eq!(zs.dd, 9.5);
    assert_eq!(zs.points.len(), 6);
    assert_eq!(zs.start_point, points[1]);
    assert_eq!(zs.end_point.as_ref(), Some(&points[4]));
    assert_eq!(zs.third_buy.as_ref(), Some(&points[6]));
    assert!(zs.third_sell.is_none());

    // zn pairs start after the first three window points; the odd leftover
    // point is dropped
    assert_eq!(zs.zn.len(), 1);
    let zn = &zs.zn[0];
    assert_eq!(zn.start_dt, dt(3));
    assert_eq!(zn.end_dt, dt(4));
    assert_eq!(zn.high, 11.5);
    assert_eq!(zn.low, 10.5);
    assert_eq!(zn.direction, Direction::Down);
    assert!((zn.mid - 11.0).abs() < 1e-9);
}

#[test]
fn scan_tail_with_a_valid_range_emits_an_open_pivot() {
    let points = vec![
        ep(0, Mark::D, 10.0),
        ep(1, Mark::G, 11.0),
        ep(2, Mark::D, 9.5),
        ep(3, Mark::G, 11.5),
        ep(4, Mark::D, 10.2),
    ];

    let pivots = find_pivots(&points);
    assert_eq!(pivots.len(), 1);

    let zs = &pivots[0];
    assert!(zs.end_point.is_none());
    assert!(zs.third_buy.is_none());
    assert!(zs.third_sell.is_none());
    assert_eq!(zs.zd, 10.0);
    assert_eq!(zs.zg, 11.0);
    assert_eq!(zs.start_point, points[1]);
    assert_eq!(zs.zn.len(), 1);
    assert_eq!(zs.zn[0].high, 11.5);
    assert_eq!(zs.zn[0].low, 10.2);
}

#[test]
fn overlapping_range_bounds_slide_the_window_without_a_pivot() {
    let points = vec![
        ep(0, Mark::D, 10.0),
        ep(1, Mark::G, 10.05),
        ep(2, Mark::D, 10.1),
        ep(3, Mark::G, 11.0),
        ep(4, Mark::D, 9.8),
        ep(5, Mark::G, 10.9),
    ];

    assert!(find_pivots(&points).is_empty());
}

#[test]
fn fewer_than_five_points_is_not_enough_for_a_pivot() {
    let points = vec![
        ep(0, Mark::D, 10.0),
        ep(1, Mark::G, 11.0),
        ep(2, Mark::D, 9.5),
        ep(3, Mark::G, 11.5),
    ];
    assert!(find_pivots(&points).is_empty());
}

#[test]
fn drop_below_the_pivot_range_emits_a_third_sell() {
    let points = vec![
        ep(0, Mark::G, 12.0),
        ep(1, Mark::D, 10.5),
        ep(2, Mark::G, 11.8),
        ep(3, Mark::D, 10.8),
        ep(4, Mark::G, 11.5),
        ep(5, Mark::G, 10.2),
    ];
    // first four: zs_d = 10.8, zs_g = 11.8; the G endpoint at 10.2 closes
    // the pivot below the range
    let pivots = find_pivots(&points);
    assert_eq!(pivots.len(), 1);
    let zs = &pivots[0];
    assert_eq!(zs.zd, 10.8);
    assert_eq!(zs.zg, 11.8);
    assert_eq!(zs.third_sell.as_ref(), Some(&points[5]));
    assert!(zs.third_buy.is_none());
}
