//! The HTTP API as a route table.
//!
//! Every route the server exposes is declared here once, with the access
//! class it requires, the body it accepts and the bodies it answers with.
//! The axum router is generated from this table and the access gate looks
//! each request up in it.

use policy::{Method, RouteTable, SensitivityClass};

/// What a route does. Selects the handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    Register,
    Login,
    Logout,
    CurrentUser,
    ListMedications,
    CreateMedication,
    DeleteMedication,
    ListAppointments,
    CreateAppointment,
    DeleteAppointment,
    TriggerPanic,
    ListUsers,
    ToggleBlock,
}

/// Request body a route accepts. Checked before the handler runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputContract {
    Registration,
    Credentials,
    NewMedication,
    NewAppointment,
    BlockToggle,
}

/// Response body shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputContract {
    User,
    Users,
    Medication,
    Medications,
    Appointment,
    Appointments,
    PanicLog,
    Message,
    Empty,
    Validation,
    NotFound,
    Unauthorized,
}

/// Per-route payload stored in the table.
#[derive(Debug, Clone)]
pub struct ApiRoute {
    pub endpoint: Endpoint,
    pub input: Option<InputContract>,
    pub responses: &'static [(u16, OutputContract)],
}

impl ApiRoute {
    /// Body shape declared for `status`, if any.
    pub fn response(&self, status: u16) -> Option<OutputContract> {
        self.responses
            .iter()
            .find(|(s, _)| *s == status)
            .map(|(_, contract)| *contract)
    }
}

pub type ApiTable = RouteTable<ApiRoute>;

fn api(
    endpoint: Endpoint,
    input: Option<InputContract>,
    responses: &'static [(u16, OutputContract)],
) -> ApiRoute {
    ApiRoute {
        endpoint,
        input,
        responses,
    }
}

/// Build the table. Fails if two routes could match the same request.
pub fn route_table() -> policy::Result<ApiTable> {
    use InputContract as In;
    use OutputContract as Out;
    use SensitivityClass::{AdminOnly, Public, StandardGated};

    let table = RouteTable::builder()
        // auth
        .route(
            Method::Post,
            "/api/register",
            Public,
            api(
                Endpoint::Register,
                Some(In::Registration),
                &[(201, Out::User), (400, Out::Validation)],
            ),
        )?
        .route(
            Method::Post,
            "/api/login",
            Public,
            api(
                Endpoint::Login,
                Some(In::Credentials),
                &[(200, Out::User), (401, Out::Unauthorized)],
            ),
        )?
        .route(
            Method::Post,
            "/api/logout",
            Public,
            api(Endpoint::Logout, None, &[(200, Out::Message)]),
        )?
        .route(
            Method::Get,
            "/api/user",
            Public,
            api(
                Endpoint::CurrentUser,
                None,
                &[(200, Out::User), (401, Out::Unauthorized)],
            ),
        )?
        // medications
        .route(
            Method::Get,
            "/api/medications",
            StandardGated,
            api(Endpoint::ListMedications, None, &[(200, Out::Medications)]),
        )?
        .route(
            Method::Post,
            "/api/medications",
            StandardGated,
            api(
                Endpoint::CreateMedication,
                Some(In::NewMedication),
                &[(201, Out::Medication), (400, Out::Validation)],
            ),
        )?
        .route(
            Method::Delete,
            "/api/medications/:id",
            StandardGated,
            api(
                Endpoint::DeleteMedication,
                None,
                &[(204, Out::Empty), (404, Out::NotFound)],
            ),
        )?
        // appointments
        .route(
            Method::Get,
            "/api/appointments",
            StandardGated,
            api(Endpoint::ListAppointments, None, &[(200, Out::Appointments)]),
        )?
        .route(
            Method::Post,
            "/api/appointments",
            StandardGated,
            api(
                Endpoint::CreateAppointment,
                Some(In::NewAppointment),
                &[(201, Out::Appointment), (400, Out::Validation)],
            ),
        )?
        .route(
            Method::Delete,
            "/api/appointments/:id",
            StandardGated,
            api(
                Endpoint::DeleteAppointment,
                None,
                &[(204, Out::Empty), (404, Out::NotFound)],
            ),
        )?
        // panic
        .route(
            Method::Post,
            "/api/panic",
            StandardGated,
            api(Endpoint::TriggerPanic, None, &[(201, Out::PanicLog)]),
        )?
        // admin
        .route(
            Method::Get,
            "/api/admin/users",
            AdminOnly,
            api(
                Endpoint::ListUsers,
                None,
                &[(200, Out::Users), (401, Out::Unauthorized)],
            ),
        )?
        .route(
            Method::Patch,
            "/api/admin/users/:id/block",
            AdminOnly,
            api(
                Endpoint::ToggleBlock,
                Some(In::BlockToggle),
                &[(200, Out::User), (404, Out::NotFound)],
            ),
        )?
        .build();

    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_builds() {
        let table = route_table().unwrap();
        assert_eq!(table.len(), 13);
    }

    #[test]
    fn test_classes() {
        let table = route_table().unwrap();
        let class = |method, path| table.resolve(method, path).unwrap().route.class;

        assert_eq!(class(Method::Post, "/api/login"), SensitivityClass::Public);
        assert_eq!(class(Method::Get, "/api/user"), SensitivityClass::Public);
        assert_eq!(
            class(Method::Post, "/api/panic"),
            SensitivityClass::StandardGated
        );
        assert_eq!(
            class(Method::Delete, "/api/appointments/3"),
            SensitivityClass::StandardGated
        );
        assert_eq!(
            class(Method::Patch, "/api/admin/users/9/block"),
            SensitivityClass::AdminOnly
        );
    }

    #[test]
    fn test_toggle_route_contract() {
        let table = route_table().unwrap();
        let resolved = table
            .resolve(Method::Patch, "/api/admin/users/12/block")
            .unwrap();
        let route = &resolved.route.endpoint;
        assert_eq!(route.endpoint, Endpoint::ToggleBlock);
        assert_eq!(route.input, Some(InputContract::BlockToggle));
        assert_eq!(route.response(200), Some(OutputContract::User));
        assert_eq!(route.response(404), Some(OutputContract::NotFound));
        assert_eq!(route.response(500), None);
        assert_eq!(resolved.params.get("id"), Some("12"));
    }

    #[test]
    fn test_every_input_route_declares_validation_or_auth_failure() {
        let table = route_table().unwrap();
        for route in table.routes().filter(|r| r.endpoint.input.is_some()) {
            let payload = &route.endpoint;
            assert!(
                payload.responses.iter().any(|(s, _)| (400..500).contains(s)),
                "{} {} declares no client error response",
                route.method,
                route.pattern
            );
        }
    }
}
