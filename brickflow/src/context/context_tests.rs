use super::*;
use pretty_assertions::assert_eq;
use serde_json::json;

#[test]
fn test_empty_context() {
    let ctx = Context::new();
    assert!(ctx.is_empty());
    assert_eq!(ctx.len(), 0);
    assert_eq!(ctx.get("@input"), None);
    assert_eq!(ctx.to_value(), json!({}));
}

#[test]
fn test_binding_normalizes_prefix() {
    let ctx = Context::new()
        .with_input(json!({"name": "Ada"}))
        .with_binding("result", json!(1));

    assert_eq!(ctx.get("@input"), Some(&json!({"name": "Ada"})));
    assert_eq!(ctx.get("input"), Some(&json!({"name": "Ada"})));
    assert_eq!(ctx.get("@result"), Some(&json!(1)));
    assert_eq!(ctx.roots(), vec!["@input".to_string(), "@result".to_string()]);
}

#[test]
fn test_extension_does_not_mutate_parent() {
    let parent = Context::new().with_input(json!(1));
    let child = parent.with_binding("@step", json!("done"));

    assert!(!parent.contains("@step"));
    assert!(child.contains("@step"));
    assert_eq!(parent.len(), 1);
    assert_eq!(child.len(), 2);
}

#[test]
fn test_shadowing_and_discard() {
    let outer = Context::new()
        .with_input(json!("outer"))
        .with_binding("@element", json!(0));
    let inner = outer.with_binding("@element", json!(1));

    assert_eq!(inner.get("@element"), Some(&json!(1)));
    assert_eq!(outer.get("@element"), Some(&json!(0)));
    assert_eq!(inner.roots(), vec!["@input".to_string(), "@element".to_string()]);
    assert_eq!(inner.to_value(), json!({"@input": "outer", "@element": 1}));
}

#[test]
fn test_with_output_uses_context_key() {
    let key = OutputKey::parse("greeting").unwrap();
    let ctx = Context::new().with_output(&key, json!({"message": "hi"}));
    assert_eq!(ctx.get("@greeting"), Some(&json!({"message": "hi"})));
}

#[test]
fn test_template_scope_strips_prefix() {
    let ctx = Context::from_roots([
        ("@input", json!({"name": "Ada"})),
        ("@options", json!({"greeting": "Hello"})),
    ]);

    assert_eq!(
        ctx.to_template_scope(),
        json!({"input": {"name": "Ada"}, "options": {"greeting": "Hello"}})
    );
}

#[test]
fn test_serializes_as_object() {
    let ctx = Context::new().with_options(json!({"debug": true}));
    let json = serde_json::to_value(&ctx).unwrap();
    assert_eq!(json, json!({"@options": {"debug": true}}));
}

#[test]
fn test_long_chain_drops_cleanly() {
    let mut ctx = Context::new();
    for index in 0..100_000 {
        ctx = ctx.with_binding("@counter", json!(index));
    }
    assert_eq!(ctx.get("@counter"), Some(&json!(99_999)));
    drop(ctx);
}

#[test]
fn test_shared_frames_survive_child_drop() {
    let parent = Context::new().with_input(json!("kept"));
    {
        let child = parent.with_binding("@tmp", json!(true));
        assert!(child.contains("@tmp"));
    }
    assert_eq!(parent.get("@input"), Some(&json!("kept")));
}
