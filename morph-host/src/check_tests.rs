#[cfg(test)]
mod tests {
    use crate::check::UnitChecker;
    use crate::config::NameResolution;
    use crate::error::CompileError;
    use morph_core::ast::Position;
    use morph_core::source::FileId;

    fn check(source: &str, resolution: NameResolution) -> Result<(), CompileError> {
        let graph = morph_parser::parse(source).unwrap();
        let file = FileId::new("unit.mo");
        let is_support = |name: &str| name == "getenv";
        let is_visible = |name: &str| matches!(name, "print" | "ambient_value");
        UnitChecker::new(&graph, &file, resolution, &is_support, &is_visible).check()
    }

    #[test]
    fn test_valid_unit() {
        let source = "import getenv\ndef f(a):\n    global g\n    g = a\n    return getenv(a)\n";
        check(source, NameResolution::Eager).unwrap();
    }

    #[test]
    fn test_return_outside_function() {
        let err = check("x = 1\nreturn x\n", NameResolution::Late).unwrap_err();
        assert_eq!(err.message, "'return' outside function");
        assert_eq!(err.position, Position::new(2, 0));
    }

    #[test]
    fn test_return_inside_top_level_if_is_still_outside() {
        let err = check("if True:\n    return 1\n", NameResolution::Late).unwrap_err();
        assert_eq!(err.position, Position::new(2, 4));
    }

    #[test]
    fn test_duplicate_parameter() {
        let err = check("def f(a, a):\n    pass\n", NameResolution::Late).unwrap_err();
        assert!(err.message.contains("duplicate argument 'a'"));
    }

    #[test]
    fn test_parameter_declared_global() {
        let err = check("def f(a):\n    global a\n", NameResolution::Late).unwrap_err();
        assert_eq!(err.message, "name 'a' is parameter and global");
        assert_eq!(err.position, Position::new(2, 4));
    }

    #[test]
    fn test_unknown_support_import() {
        let err = check("import launch_rockets\n", NameResolution::Late).unwrap_err();
        assert_eq!(err.message, "no support symbol named 'launch_rockets'");
    }

    #[test]
    fn test_late_resolution_accepts_unbound_names() {
        check("def f():\n    return missing\n", NameResolution::Late).unwrap();
    }

    #[test]
    fn test_eager_resolution_reports_first_unbound_name() {
        let source = "def f(x):\n    y = x\n    return y + missing\n";
        let err = check(source, NameResolution::Eager).unwrap_err();
        assert_eq!(err.message, "name 'missing' is not defined");
        assert_eq!(err.position, Position::new(3, 15));
    }

    #[test]
    fn test_eager_resolution_sees_enclosing_and_later_definitions() {
        let source = "def outer(a):\n    def inner():\n        return a + helper() + ambient_value\n    return inner\ndef helper():\n    return 1\n";
        check(source, NameResolution::Eager).unwrap();
    }

    #[test]
    fn test_eager_resolution_checks_markers() {
        let err = check("@unknown_marker\ndef f():\n    pass\n", NameResolution::Eager)
            .unwrap_err();
        assert_eq!(err.position, Position::new(1, 1));
    }
}
