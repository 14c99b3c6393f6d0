#[cfg(test)]
mod tests {
    use super::super::*;

    #[test]
    fn test_empty_file_gives_defaults() {
        let config = Config::from_toml_str("").unwrap();
        assert_eq!(config.bind_addr(), "127.0.0.1:8000");
        assert!(!config.llm.mock);
        assert_eq!(config.engine.thresholds.similarity_threshold, 0.75);
        assert!(config.backend_configs().is_empty());
    }

    #[test]
    fn test_default_gemini_model() {
        assert_eq!(default_gemini_model(), "gemini-2.5-flash");
    }

    #[test]
    fn test_mock_mode_overrides_real_backends() {
        let config = Config::from_toml_str(
            r#"
            [llm]
            mock = true

            [llm.ollama]
            model = "llama3:8b"
            "#,
        )
        .unwrap();
        let backends = config.backend_configs();
        assert_eq!(backends.len(), 1);
        assert_eq!(backends[0].kind, BackendKind::Mock);
    }

    #[test]
    fn test_backends_in_declaration_order() {
        let config = Config::from_toml_str(
            r#"
            [llm]
            default_backend = "ollama"

            [llm.gemini]
            api_key = "g-key"

            [llm.ollama]

            [llm.openai_compatible]
            base_url = "http://localhost:8080/v1"
            model = "qwen2.5"
            api_key = "c-key"
            "#,
        )
        .unwrap();
        let backends = config.backend_configs();
        let names: Vec<_> = backends.iter().map(|b| b.name.as_str()).collect();
        assert_eq!(names, vec!["gemini", "ollama", "openai_compatible"]);

        assert_eq!(backends[0].model, "gemini-2.5-flash");
        assert_eq!(backends[0].api_key.as_ref().unwrap().expose_secret(), "g-key");
        assert_eq!(backends[1].base_url.as_deref(), Some("http://localhost:11434"));
        assert_eq!(backends[2].api_key.as_ref().unwrap().expose_secret(), "c-key");
        assert_eq!(config.llm.default_backend.as_deref(), Some("ollama"));
    }

    #[test]
    fn test_engine_section_is_validated() {
        let err = Config::from_toml_str(
            r#"
            [engine.thresholds]
            similarity_threshold = 1.5
            "#,
        );
        assert!(err.is_err());
    }

    #[test]
    fn test_partial_engine_section_keeps_defaults() {
        let config = Config::from_toml_str(
            r#"
            [server]
            port = 9100

            [engine.jobs]
            request_timeout_secs = 30
            "#,
        )
        .unwrap();
        assert_eq!(config.server.port, 9100);
        assert_eq!(config.engine.jobs.request_timeout_secs, 30);
        assert_eq!(config.engine.extraction.chunk_chars, 1500);
    }
}
