//! Application root service.

use service_framework::{
    handle, Service, ServiceCore, ServiceError, ServiceHandle, ServiceType, Setting,
};
use tracing::info;

const APP: &str = "sample.AppService";

/// Root of the sample tree. Carries process-level settings; `APP_ENV` must
/// be supplied before `init`.
pub struct AppService {
    core: ServiceCore,
}

impl AppService {
    pub fn create(name: &str) -> ServiceHandle {
        handle(Self {
            core: ServiceCore::builder(APP)
                .name(name)
                .setting(Setting::new("APP_NAME", "sample"))
                .setting(Setting::required("APP_ENV"))
                .build(),
        })
    }

    pub fn service_type() -> ServiceType {
        ServiceType::concrete(APP, |name| Self::create(name))
    }
}

impl Service for AppService {
    fn core(&self) -> &ServiceCore {
        &self.core
    }

    fn on_initialized(&self) -> Result<(), ServiceError> {
        let config = self.core.config();
        let env = config.require("APP_ENV")?;
        info!(
            app = %config.get_or("APP_NAME", "sample"),
            env = %env,
            "application configured"
        );
        Ok(())
    }
}
