//! Builtin: templates every deployment has before configuration loads.
//!
//! Names start with a space so configuration directives (whose names are
//! trimmed) can never shadow or collide with them.

use tracing::debug;

use crate::compile::TemplateCompiler;
use crate::registry::{RegistryError, TemplateRegistry};

pub const TRADITIONAL_FORMAT: &str = " TradFmt";
pub const WALL_FORMAT: &str = " WallFmt";
pub const FORWARD_FORMAT: &str = " StdFwdFmt";
pub const USER_MESSAGE_FORMAT: &str = " StdUsrMsgFmt";
pub const DATABASE_FORMAT: &str = " StdDBFmt";

/// `(name, spec)` pairs in registration order.
pub const BUILTIN_TEMPLATES: &[(&str, &str)] = &[
    (
        TRADITIONAL_FORMAT,
        r#""%TIMESTAMP% %HOSTNAME% %syslogtag%%msg:::drop-last-lf%\n""#,
    ),
    (
        WALL_FORMAT,
        r#""\r\n\7Message from syslogd@%HOSTNAME% at %timegenerated% ...\r\n %syslogtag%%msg%\n\r""#,
    ),
    (
        FORWARD_FORMAT,
        r#""<%PRI%>%TIMESTAMP% %HOSTNAME% %syslogtag%%msg%""#,
    ),
    (USER_MESSAGE_FORMAT, r#"" %syslogtag%%msg%\n\r""#),
    (
        DATABASE_FORMAT,
        r#""insert into SystemEvents (Message, Facility, FromHost, Priority, DeviceReportedTime, ReceivedAt, InfoUnitID, SysLogTag) values ('%msg%', %syslogfacility%, '%HOSTNAME%', %syslogpriority%, '%timereported:::date-mysql%', '%timegenerated:::date-mysql%', %iut%, '%syslogtag%')",SQL"#,
    ),
];

/// Register the built-in templates and mark the boundary behind them.
pub fn register_builtins(
    registry: &mut TemplateRegistry,
    compiler: &TemplateCompiler,
) -> Result<(), RegistryError> {
    for (name, spec) in BUILTIN_TEMPLATES {
        registry.register(compiler.compile_str(name, spec))?;
    }
    registry.mark_builtin_boundary()?;
    debug!(count = BUILTIN_TEMPLATES.len(), "built-in templates registered");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    use crate::model::SqlMode;
    use crate::render::render;

    fn builtins() -> TemplateRegistry {
        let mut reg = TemplateRegistry::new();
        register_builtins(&mut reg, &TemplateCompiler::new()).unwrap();
        reg
    }

    fn syslog_record() -> HashMap<String, String> {
        [
            ("TIMESTAMP", "Jul  3 09:05:07"),
            ("HOSTNAME", "web01"),
            ("syslogtag", "sshd[42]:"),
            ("msg", " session opened\n"),
            ("PRI", "38"),
        ]
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
    }

    #[test]
    fn test_all_builtins_registered_behind_boundary() {
        let reg = builtins();
        assert_eq!(reg.len(), BUILTIN_TEMPLATES.len());
        assert_eq!(reg.builtin_count(), Some(BUILTIN_TEMPLATES.len()));
        for (name, _) in BUILTIN_TEMPLATES {
            assert!(reg.find_by_name(name).is_some(), "missing builtin {:?}", name);
        }
    }

    #[test]
    fn test_database_format_uses_sql() {
        let reg = builtins();
        let tpl = reg.find_by_name(DATABASE_FORMAT).unwrap();
        assert_eq!(tpl.sql_mode(), SqlMode::MySqlSmart);
    }

    #[test]
    fn test_traditional_format_renders() {
        let reg = builtins();
        let tpl = reg.find_by_name(TRADITIONAL_FORMAT).unwrap();
        assert_eq!(
            render(&tpl, &syslog_record()).unwrap(),
            "Jul  3 09:05:07 web01 sshd[42]: session opened\n"
        );
    }

    #[test]
    fn test_forward_format_renders() {
        let reg = builtins();
        let tpl = reg.find_by_name(FORWARD_FORMAT).unwrap();
        assert_eq!(
            render(&tpl, &syslog_record()).unwrap(),
            "<38>Jul  3 09:05:07 web01 sshd[42]: session opened\n"
        );
    }

    #[test]
    fn test_wall_format_has_bell() {
        let reg = builtins();
        let tpl = reg.find_by_name(WALL_FORMAT).unwrap();
        let out = render(&tpl, &syslog_record()).unwrap();
        assert!(out.starts_with("\r\n\u{7}Message from syslogd@web01 at "));
    }

    #[test]
    fn test_config_names_cannot_collide() {
        let tpl = TemplateCompiler::new().compile_directive(r#" TradFmt ,"x""#);
        assert_eq!(tpl.name(), "TradFmt");
        assert_ne!(tpl.name(), TRADITIONAL_FORMAT);
    }
}
