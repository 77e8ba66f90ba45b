use std::collections::HashMap;
use std::io;

use classlens_core::context::{LoadingScope, ReflectedClass, ResolutionContext};
use classlens_core::locator::{has_resource, locate, Located};
use classlens_core::TypeName;

#[derive(Default)]
struct FakeContext {
    live: Option<ReflectedClass>,
    scoped: HashMap<String, Vec<u8>>,
    system: HashMap<String, Vec<u8>>,
    fail: bool,
}

impl ResolutionContext for FakeContext {
    fn loaded_class(&self, _: Option<&LoadingScope>, _: &TypeName) -> Option<ReflectedClass> {
        self.live.clone()
    }

    fn find_resource(&self, _: &LoadingScope, resource: &str) -> io::Result<Option<Vec<u8>>> {
        if self.fail {
            return Err(io::Error::new(io::ErrorKind::PermissionDenied, "denied"));
        }
        Ok(self.scoped.get(resource).cloned())
    }

    fn find_system_resource(&self, resource: &str) -> io::Result<Option<Vec<u8>>> {
        Ok(self.system.get(resource).cloned())
    }
}

fn widget() -> TypeName {
    TypeName::new("com.example.Widget").unwrap()
}

#[test]
fn live_types_take_precedence() {
    let live = ReflectedClass {
        name: widget(),
        access: 0x21,
        super_name: None,
        interfaces: Vec::new(),
        fields: Vec::new(),
        methods: Vec::new(),
    };
    let mut ctx = FakeContext { live: Some(live.clone()), ..FakeContext::default() };
    ctx.scoped.insert("com/example/Widget.class".into(), vec![1]);
    let scope = LoadingScope::new("app");
    assert_eq!(locate(&ctx, Some(&scope), &widget()).unwrap(), Located::Live(live));
    // The resource check ignores the live registry.
    assert!(has_resource(&ctx, Some(&scope), &widget()).unwrap());
}

#[test]
fn scope_selects_scoped_or_global_lookup() {
    let mut ctx = FakeContext::default();
    ctx.scoped.insert("com/example/Widget.class".into(), vec![1]);
    ctx.system.insert("com/example/Widget.class".into(), vec![2]);
    let scope = LoadingScope::new("app");

    assert_eq!(locate(&ctx, Some(&scope), &widget()).unwrap(), Located::Bytes(vec![1]));
    assert_eq!(locate(&ctx, None, &widget()).unwrap(), Located::Bytes(vec![2]));

    let missing = TypeName::new("com.example.Missing").unwrap();
    assert_eq!(locate(&ctx, None, &missing).unwrap(), Located::NotFound);
    assert!(!has_resource(&ctx, Some(&scope), &missing).unwrap());
}

#[test]
fn read_failures_propagate() {
    let ctx = FakeContext { fail: true, ..FakeContext::default() };
    let err = locate(&ctx, Some(&LoadingScope::new("app")), &widget()).unwrap_err();
    assert_eq!(err.kind(), io::ErrorKind::PermissionDenied);
}
