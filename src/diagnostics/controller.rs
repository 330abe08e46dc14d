//! Conditional start of diagnostic instrumentation.

use std::path::PathBuf;
use std::sync::Arc;

use crate::config::env::{vars, Environment};
use crate::diagnostics::cpu::{self, CpuProfileSession};
use crate::diagnostics::introspection::{IntrospectionServer, IntrospectionState};
use crate::diagnostics::session::{DiagnosticSession, DiagnosticsError, SessionStack};
use crate::diagnostics::trace::TraceSession;
use crate::lifecycle::AppContext;
use crate::observability::LogHandle;

/// Which diagnostics were requested through the environment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiagnosticsConfig {
    pub cpu_profile: Option<PathBuf>,
    pub cpu_frequency: i32,
    pub trace_profile: Option<PathBuf>,
    pub profile_addr: Option<String>,
}

impl DiagnosticsConfig {
    pub fn from_env(env: &Environment) -> Self {
        Self {
            cpu_profile: env.non_empty(vars::CPU_PROFILE).map(PathBuf::from),
            cpu_frequency: env
                .non_empty(vars::CPU_PROFILE_HZ)
                .and_then(|v| v.parse().ok())
                .filter(|hz| *hz > 0)
                .unwrap_or(cpu::DEFAULT_FREQUENCY),
            trace_profile: env.non_empty(vars::TRACE_PROFILE).map(PathBuf::from),
            profile_addr: env.non_empty(vars::PROFILE_ADDR).map(str::to_string),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.cpu_profile.is_none() && self.trace_profile.is_none() && self.profile_addr.is_none()
    }
}

/// Started diagnostics.
///
/// Sessions live on the shared [`SessionStack`] and are stopped by the
/// shutdown teardown. The introspection server is only held here.
#[derive(Default)]
pub struct Diagnostics {
    introspection: Option<IntrospectionServer>,
}

impl Diagnostics {
    /// Start the requested diagnostics: CPU profile, then trace, then
    /// introspection.
    ///
    /// Any failure is fatal. Sessions already started are stopped before the
    /// error is returned.
    pub async fn start(
        config: &DiagnosticsConfig,
        log: &LogHandle,
        sessions: &Arc<SessionStack>,
        ctx: &Arc<AppContext>,
    ) -> Result<Self, DiagnosticsError> {
        match Self::start_all(config, log, sessions, ctx).await {
            Ok(diagnostics) => Ok(diagnostics),
            Err(e) => {
                sessions.unwind();
                Err(e)
            }
        }
    }

    async fn start_all(
        config: &DiagnosticsConfig,
        log: &LogHandle,
        sessions: &Arc<SessionStack>,
        ctx: &Arc<AppContext>,
    ) -> Result<Self, DiagnosticsError> {
        if let Some(path) = &config.cpu_profile {
            let session = CpuProfileSession::start(path, config.cpu_frequency)?;
            register(sessions, Box::new(session))?;
            tracing::info!(path = %path.display(), "cpu profile enabled");
        }

        if let Some(path) = &config.trace_profile {
            let session = TraceSession::start(path, log)?;
            register(sessions, Box::new(session))?;
            tracing::info!(path = %path.display(), "trace profile enabled");
        }

        let introspection = match &config.profile_addr {
            Some(addr) => {
                let state = IntrospectionState::new(ctx.clone(), sessions.clone());
                let server = IntrospectionServer::start(addr, state).await?;
                tracing::info!(address = %server.local_addr(), "http introspection enabled");
                Some(server)
            }
            None => None,
        };

        Ok(Self { introspection })
    }

    pub fn introspection(&self) -> Option<&IntrospectionServer> {
        self.introspection.as_ref()
    }
}

/// Push a started session, stopping it right away if teardown already ran.
fn register(
    sessions: &SessionStack,
    session: Box<dyn DiagnosticSession>,
) -> Result<(), DiagnosticsError> {
    let kind = session.kind();
    sessions.push(session).map_err(|rejected| {
        if let Err(e) = rejected.stop() {
            tracing::warn!(session = %kind, error = %e, "failed to stop rejected session");
        }
        DiagnosticsError::ShuttingDown(kind)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{EffectiveConfig, PathConfig};
    use crate::diagnostics::session::SessionKind;
    use crate::observability::logging::{build, LogFormat};
    use crate::observability::{resolve, Verbosity};

    fn context(env: &Environment) -> Arc<AppContext> {
        Arc::new(AppContext::new(
            env.clone(),
            EffectiveConfig::new(),
            PathConfig::resolve(env),
            resolve(env, "warn"),
        ))
    }

    #[test]
    fn test_config_from_env() {
        let env = Environment::default()
            .with(vars::TRACE_PROFILE, "/tmp/trace.jsonl")
            .with(vars::CPU_PROFILE_HZ, "250")
            .with(vars::PROFILE_ADDR, "");
        let config = DiagnosticsConfig::from_env(&env);

        assert_eq!(config.trace_profile, Some(PathBuf::from("/tmp/trace.jsonl")));
        assert_eq!(config.cpu_profile, None);
        assert_eq!(config.cpu_frequency, 250);
        assert_eq!(config.profile_addr, None);
        assert!(!config.is_empty());

        let bad_hz = Environment::default().with(vars::CPU_PROFILE_HZ, "-5");
        assert_eq!(
            DiagnosticsConfig::from_env(&bad_hz).cpu_frequency,
            cpu::DEFAULT_FREQUENCY
        );
    }

    #[tokio::test]
    async fn test_nothing_requested_opens_nothing() {
        let env = Environment::default();
        let config = DiagnosticsConfig::from_env(&env);
        assert!(config.is_empty());

        let (_subscriber, log) = build(Verbosity::Warn, LogFormat::Pretty);
        let sessions = Arc::new(SessionStack::new());
        let diagnostics = Diagnostics::start(&config, &log, &sessions, &context(&env))
            .await
            .unwrap();

        assert!(diagnostics.introspection().is_none());
        assert!(sessions.is_empty());
        assert!(!log.trace_attached());
        assert_eq!(sessions.unwind(), 0);
    }

    #[tokio::test]
    async fn test_trace_and_introspection_started() {
        let dir = tempfile::tempdir().unwrap();
        let env = Environment::default()
            .with(vars::TRACE_PROFILE, dir.path().join("trace.jsonl").to_string_lossy())
            .with(vars::PROFILE_ADDR, "127.0.0.1:0");

        let (_subscriber, log) = build(Verbosity::Warn, LogFormat::Pretty);
        let sessions = Arc::new(SessionStack::new());
        let diagnostics = Diagnostics::start(
            &DiagnosticsConfig::from_env(&env),
            &log,
            &sessions,
            &context(&env),
        )
        .await
        .unwrap();

        assert_eq!(sessions.active(), vec![SessionKind::Trace]);
        assert!(log.trace_attached());
        assert!(diagnostics.introspection().unwrap().is_running());

        assert_eq!(sessions.unwind(), 1);
        assert!(!log.trace_attached());
    }

    #[tokio::test]
    async fn test_failure_unwinds_started_sessions() {
        let dir = tempfile::tempdir().unwrap();
        let taken = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let env = Environment::default()
            .with(vars::TRACE_PROFILE, dir.path().join("trace.jsonl").to_string_lossy())
            .with(vars::PROFILE_ADDR, taken.local_addr().unwrap().to_string());

        let (_subscriber, log) = build(Verbosity::Warn, LogFormat::Pretty);
        let sessions = Arc::new(SessionStack::new());
        let err = Diagnostics::start(
            &DiagnosticsConfig::from_env(&env),
            &log,
            &sessions,
            &context(&env),
        )
        .await
        .err()
        .unwrap();

        assert!(matches!(err, DiagnosticsError::Bind { .. }));
        assert!(sessions.is_empty());
        assert!(sessions.is_closed());
        assert!(!log.trace_attached());
    }

    #[tokio::test]
    async fn test_late_session_rejected_and_stopped() {
        let dir = tempfile::tempdir().unwrap();
        let env = Environment::default()
            .with(vars::TRACE_PROFILE, dir.path().join("trace.jsonl").to_string_lossy());

        let (_subscriber, log) = build(Verbosity::Warn, LogFormat::Pretty);
        let sessions = Arc::new(SessionStack::new());
        sessions.unwind();

        let err = Diagnostics::start(
            &DiagnosticsConfig::from_env(&env),
            &log,
            &sessions,
            &context(&env),
        )
        .await
        .err()
        .unwrap();

        assert!(matches!(err, DiagnosticsError::ShuttingDown(SessionKind::Trace)));
        assert!(!log.trace_attached());
    }
}
