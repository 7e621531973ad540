#[cfg(test)]
mod tests {
    use crate::error::PipelineError;
    use crate::virtual_module::VirtualModuleRegistry;
    use morph_core::ast::Position;
    use morph_core::{FileId, Value};
    use morph_host::{HostConfig, Loader};
    use std::rc::Rc;

    fn registry(config: HostConfig) -> (Loader, VirtualModuleRegistry) {
        let loader = Loader::new(config);
        let registry = VirtualModuleRegistry::new(Rc::new(loader.clone()), loader.sources().clone());
        (loader, registry)
    }

    #[test]
    fn test_create_rejects_existing_name() {
        let (_, registry) = registry(HostConfig::default());
        registry.create("graph").unwrap();
        let err = registry.create("graph").unwrap_err();
        assert!(matches!(err, PipelineError::VirtualModuleExists(name) if name == "graph"));
        assert!(registry.contains("graph"));
        assert_eq!(registry.names(), vec!["graph".to_string()]);
    }

    #[test]
    fn test_get_or_create_returns_same_namespace() {
        let (_, registry) = registry(HostConfig::default());
        let first = registry.get_or_create("m");
        let second = registry.get_or_create("m");
        assert!(first.ptr_eq(&second));
        assert!(registry.get("other").is_none());
    }

    #[test]
    fn test_installs_accumulate() {
        let (loader, registry) = registry(HostConfig::eager());
        registry
            .install("m", "def a():\n    return 1\n")
            .unwrap();
        let namespace = registry
            .install("m", "def b():\n    return a() + 1\n")
            .unwrap();

        assert!(namespace.contains("a"));
        let b = namespace.get("b").unwrap();
        assert_eq!(loader.call(&b, &[]).unwrap(), Value::Integer(2));
    }

    #[test]
    fn test_registries_sharing_sources_keep_installs_apart() {
        let (loader, first) = registry(HostConfig::default());
        let second = VirtualModuleRegistry::new(Rc::new(loader.clone()), loader.sources().clone());

        first.install("m", "a = 1\n").unwrap();
        second.install("m", "b = 2\n").unwrap();

        let sources = loader.sources();
        assert_eq!(
            sources.text(&FileId::new("<virtual:m#1>")).as_deref(),
            Some("a = 1\n")
        );
        assert_eq!(
            sources.text(&FileId::new("<virtual:m#2>")).as_deref(),
            Some("b = 2\n")
        );
    }

    #[test]
    fn test_self_and_mutual_reference() {
        let (loader, registry) = registry(HostConfig::default());
        registry
            .install(
                "parity",
                "def is_even(n):\n    if n == 0:\n        return True\n    return is_odd(n - 1)\n",
            )
            .unwrap();
        let namespace = registry
            .install(
                "parity",
                "def is_odd(n):\n    if n == 0:\n        return False\n    return is_even(n - 1)\n",
            )
            .unwrap();

        let is_even = namespace.get("is_even").unwrap();
        assert_eq!(
            loader.call(&is_even, &[Value::Integer(10)]).unwrap(),
            Value::Boolean(true)
        );
    }

    #[test]
    fn test_eager_resolution_needs_install_order() {
        let (_, registry) = registry(HostConfig::eager());
        let err = registry
            .install("m", "def b():\n    return a() + 1\n")
            .unwrap_err();
        let PipelineError::CompileError {
            message, position, ..
        } = err
        else {
            panic!("expected compile error");
        };
        assert_eq!(message, "name 'a' is not defined");
        assert_eq!(position, Position::new(2, 11));
    }

    #[test]
    fn test_modules_are_isolated() {
        let (_, registry) = registry(HostConfig::eager());
        registry.install("left", "x = 1\n").unwrap();
        assert!(registry.install("right", "y = x\n").is_err());
        assert!(!registry.get_or_create("right").contains("x"));
    }
}
