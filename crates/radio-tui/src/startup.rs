//! Startup steps that can be cut short, and the process exit status.

use std::future::Future;
use std::io;
use std::ops::ControlFlow;
use std::pin::Pin;

use tracing::{error, info, warn};

use radio_core::catalog::{empty_catalog, Catalog, CatalogError, CatalogFetcher};

use crate::app::Exit;

pub const EXIT_OK: u8 = 0;
pub const EXIT_FAILURE: u8 = 1;

/// Run one startup step, giving up on it if `interrupt` completes first.
/// The step is dropped on interrupt, which tears down whatever it started.
pub async fn or_interrupt<T, F, I>(
    step: F,
    interrupt: Pin<&mut I>,
) -> anyhow::Result<ControlFlow<Exit, T>>
where
    F: Future<Output = anyhow::Result<ControlFlow<Exit, T>>>,
    I: Future<Output = io::Result<()>>,
{
    tokio::select! {
        biased;
        res = interrupt => {
            res?;
            info!("interrupted during startup");
            Ok(ControlFlow::Break(Exit::Interrupted))
        }
        res = step => res,
    }
}

/// Only an unreachable directory stops the program; any other failure
/// starts it with no stations, as a failed refresh would.
pub fn classify_initial_fetch(
    result: Result<Catalog, CatalogError>,
) -> ControlFlow<Exit, Catalog> {
    match result {
        Ok(catalog) => ControlFlow::Continue(catalog),
        Err(e) if e.is_connect() => {
            error!("initial fetch failed: {}", e);
            ControlFlow::Break(Exit::ConnectionFailed)
        }
        Err(e) => {
            warn!("initial fetch failed, starting with no stations: {}", e);
            ControlFlow::Continue(empty_catalog())
        }
    }
}

pub async fn initial_catalog(
    fetcher: &CatalogFetcher,
) -> anyhow::Result<ControlFlow<Exit, Catalog>> {
    Ok(classify_initial_fetch(fetcher.try_fetch().await))
}

pub fn exit_status(result: &anyhow::Result<Exit>) -> u8 {
    match result {
        Ok(Exit::Quit | Exit::Interrupted) => EXIT_OK,
        Ok(Exit::ConnectionFailed) | Err(_) => EXIT_FAILURE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::future::{pending, ready};
    use std::pin::pin;
    use std::time::Duration;

    use radio_core::catalog::Station;

    fn never() -> std::future::Pending<io::Result<()>> {
        pending()
    }

    fn unreachable_fetcher() -> CatalogFetcher {
        // Port 1 on loopback: nothing listens there.
        CatalogFetcher::new("http://127.0.0.1:1/v1/api/genre/all", Duration::from_secs(2)).unwrap()
    }

    #[tokio::test]
    async fn test_unreachable_directory_fails_with_status_one() {
        let fetcher = unreachable_fetcher();
        let flow = or_interrupt(initial_catalog(&fetcher), pin!(never()))
            .await
            .unwrap();
        assert_eq!(flow, ControlFlow::Break(Exit::ConnectionFailed));
        assert_eq!(exit_status(&Ok(Exit::ConnectionFailed)), EXIT_FAILURE);
    }

    #[test]
    fn test_non_connect_failures_start_empty() {
        let decode = serde_json::from_str::<serde_json::Value>("nope").unwrap_err();
        match classify_initial_fetch(Err(CatalogError::Decode(decode))) {
            ControlFlow::Continue(catalog) => assert!(catalog.is_empty()),
            ControlFlow::Break(exit) => panic!("stopped with {exit:?}"),
        }

        let catalog: Catalog = vec![Station::new("A", "T", "u")].into();
        assert_eq!(
            classify_initial_fetch(Ok(catalog.clone())),
            ControlFlow::Continue(catalog)
        );
    }

    #[tokio::test]
    async fn test_interrupt_during_startup_is_a_clean_exit() {
        let stuck = async {
            pending::<()>().await;
            Ok::<_, anyhow::Error>(ControlFlow::<Exit, ()>::Continue(()))
        };
        let flow = or_interrupt(stuck, pin!(ready(Ok::<(), io::Error>(()))))
            .await
            .unwrap();
        assert_eq!(flow, ControlFlow::Break(Exit::Interrupted));
        assert_eq!(exit_status(&Ok(Exit::Interrupted)), EXIT_OK);
    }

    #[tokio::test]
    async fn test_startup_step_result_passes_through() {
        let step = async { Ok::<_, anyhow::Error>(ControlFlow::Continue(7)) };
        let flow = or_interrupt(step, pin!(never())).await.unwrap();
        assert_eq!(flow, ControlFlow::<Exit, i32>::Continue(7));

        let failing = async { Err::<ControlFlow<Exit, ()>, _>(anyhow::anyhow!("mpv missing")) };
        assert!(or_interrupt(failing, pin!(never())).await.is_err());
    }

    #[test]
    fn test_exit_status() {
        assert_eq!(exit_status(&Ok(Exit::Quit)), EXIT_OK);
        assert_eq!(exit_status(&Ok(Exit::Interrupted)), EXIT_OK);
        assert_eq!(exit_status(&Err(anyhow::anyhow!("engine died"))), EXIT_FAILURE);
    }
}
