use crate::core::config::data::Config;

fn show(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or("(unset)")
}

fn mask(value: &Option<String>) -> &'static str {
    match value {
        Some(_) => "(set)",
        None => "(unset)",
    }
}

impl Config {
    pub fn print_all(&self) {
        println!("Current configuration:");
        println!("  completion-url: {}", show(&self.completion_url));
        println!("  api-url: {}", show(&self.api_base_url));
        println!("  api-key: {}", mask(&self.api_key));
        match self.stream_idle_timeout_secs {
            Some(secs) => println!("  idle-timeout: {secs}s"),
            None => println!("  idle-timeout: (none)"),
        }
        match self.typewriter_delay_ms {
            Some(ms) => println!("  typewriter-delay: {ms}ms"),
            None => println!("  typewriter-delay: (none)"),
        }
        println!("  admin-username: {}", show(&self.admin_username));
        println!("  admin-password: {}", mask(&self.admin_password));
        match self.production.unwrap_or(false) {
            true => println!("  production: on"),
            false => println!("  production: off"),
        }
    }
}
