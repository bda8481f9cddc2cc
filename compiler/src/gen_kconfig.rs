use crate::utils::{quote, GENERATED_NOTICE};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Bool,
    Int,
}

/// One `config` entry of a Kconfig fragment.
#[derive(Debug, Clone, PartialEq)]
pub struct KconfigOption {
    pub symbol:     String,
    pub kind:       Kind,
    pub prompt:     String,
    pub depends_on: Option<String>,
    pub range:      Option<(i64, i64)>,
    pub default:    Option<String>,
    pub help:       Option<String>,
}

impl KconfigOption {
    pub fn new(symbol: String, kind: Kind, prompt: String) -> Self {
        KconfigOption {
            symbol,
            kind,
            prompt,
            depends_on: None,
            range:      None,
            default:    None,
            help:       None,
        }
    }

    pub fn render(&self) -> Vec<String> {
        let kind = match self.kind {
            Kind::Bool => "bool",
            Kind::Int  => "int",
        };
        let mut lines = vec![
            format!("config {}", self.symbol),
            format!("\t{} {}", kind, quote(&self.prompt)),
        ];
        if let Some(dep) = &self.depends_on {
            lines.push(format!("\tdepends on {}", dep));
        }
        if let Some((lo, hi)) = self.range {
            lines.push(format!("\trange {} {}", lo, hi));
        }
        if let Some(default) = &self.default {
            lines.push(format!("\tdefault {}", default));
        }
        if let Some(help) = &self.help {
            lines.push("\thelp".to_string());
            for line in help.lines() {
                lines.push(format!("\t  {}", line.trim_end()));
            }
        }
        lines.push(String::new());
        lines
    }
}

/// Complete fragment: notice followed by every option in order.
pub fn fragment(options: &[KconfigOption]) -> String {
    let mut lines = vec![format!("# {}", GENERATED_NOTICE), String::new()];
    for option in options {
        lines.extend(option.render());
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bool_option() {
        let mut option =
            KconfigOption::new("KV_STORE_KEY_REBOOTS".into(), Kind::Bool, "Key: REBOOTS".into());
        option.default = Some("y".into());
        option.help = Some("Number of reboots".into());
        assert_eq!(
            option.render().join("\n"),
            "config KV_STORE_KEY_REBOOTS\n\tbool \"Key: REBOOTS\"\n\tdefault y\n\thelp\n\t  Number of reboots\n"
        );
    }

    #[test]
    fn test_int_option() {
        let mut option = KconfigOption::new("X_RANGE".into(), Kind::Int, "Range".into());
        option.depends_on = Some("X".into());
        option.range = Some((1, 255));
        option.default = Some("4".into());
        let text = option.render().join("\n");
        assert!(text.contains("\tint \"Range\"\n\tdepends on X\n\trange 1 255\n\tdefault 4\n"));
    }

    #[test]
    fn test_fragment_notice() {
        let text = fragment(&[]);
        assert!(text.starts_with("# Automatically generated"));
    }
}
