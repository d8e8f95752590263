use super::*;

#[test]
fn test_search_limit_depth_only() {
    let limit = SearchLimit::depth(18);
    assert_eq!(limit, SearchLimit::Depth(18));
    assert!(limit.budget().is_none());
}

#[test]
fn test_search_limit_with_time() {
    let limit = SearchLimit::time(Duration::from_millis(100));
    assert_eq!(limit.budget(), Some(Duration::from_millis(100)));
}

#[test]
fn test_from_secs_rejects_nonsense() {
    assert_eq!(
        SearchLimit::from_secs_f64(2.0),
        Some(SearchLimit::Time(Duration::from_secs(2)))
    );
    assert_eq!(SearchLimit::from_secs_f64(0.0), None);
    assert_eq!(SearchLimit::from_secs_f64(-1.0), None);
    assert_eq!(SearchLimit::from_secs_f64(f64::NAN), None);
}

#[test]
fn test_deadline_adds_grace() {
    let grace = Duration::from_millis(500);
    let depth_budget = Duration::from_secs(60);

    let timed = SearchLimit::time(Duration::from_secs(2));
    assert_eq!(timed.deadline(depth_budget, grace), Duration::from_millis(2500));

    let deep = SearchLimit::depth(20);
    assert_eq!(deep.deadline(depth_budget, grace), Duration::from_millis(60_500));
}

#[test]
fn test_display() {
    assert_eq!(SearchLimit::time(Duration::from_millis(1500)).to_string(), "1500ms/move");
    assert_eq!(SearchLimit::depth(18).to_string(), "depth 18");
}
