use spike_trace::{register_metric, MetricDef, RegistryError};

#[test]
fn test_global_tracer_lifecycle() {
    std::env::set_var("SPIKE_TRACE", "1");
    std::env::set_var("SPIKE_TRACE_TOP_K", "3");

    let rows = MetricDef::builder("Rows", "rows", || 0.0).build().unwrap();
    register_metric(rows).unwrap();

    let tracer = spike_trace::global();
    assert!(tracer.is_enabled());
    assert_eq!(tracer.top_k(), 3);

    let names: Vec<&str> = tracer.metrics().map(|m| m.name()).collect();
    assert_eq!(names, vec!["Latency", "Rows"]);

    {
        let _job = spike_trace::trace("job");
    }

    let late = MetricDef::builder("Late", "u", || 0.0).build().unwrap();
    assert!(matches!(register_metric(late), Err(RegistryError::Frozen(name)) if name == "Late"));

    let summary = tracer.summary();
    assert!(summary.contains("  Top 3 Latency Spikes:\n"));
    assert!(summary.contains("  Top 3 Rows Spikes:\n"));
    assert!(summary.contains("]  job"));
}
