//! Effective-service resolution (§4.E): the authoritative "what runs
//! today" set, combining the weekly base calendar with date-specific
//! exceptions.

use model::calendar::{Service, ServiceException, ServiceExceptionType};

/// Computes the effective services on a date from the default (weekly)
/// set and the day's exceptions:
///
/// 1. `default` already carries only services whose weekday flag and
///    `[start, end]` span cover the date (computed by the caller via
///    `ServicesDefaultForDate`).
/// 2. Added exceptions are unioned in unless already present by id.
/// 3. Removed exceptions drop any service with a matching id.
///
/// Idempotent with respect to duplicate `added` exceptions for a service
/// already in `default`.
pub fn effective_services(default: Vec<Service>, exceptions: &[ServiceException]) -> Vec<Service> {
    let mut by_id: std::collections::HashMap<String, Service> =
        default.into_iter().map(|service| (service.id.raw(), service)).collect();

    for exception in exceptions {
        match exception.exception_type {
            ServiceExceptionType::Added => {
                by_id.entry(exception.service_id.raw()).or_insert_with(|| {
                    Service::new(
                        exception.service_id.clone(),
                        [false, false, false, false, false, false, false],
                        exception.date,
                        exception.date,
                        vec![],
                    )
                    .expect("exception.service_id is non-empty")
                });
            }
            ServiceExceptionType::Removed => {
                by_id.remove(&exception.service_id.raw());
            }
        }
    }

    by_id.into_values().collect()
}

#[cfg(test)]
mod tests {
    use utility::id::Id;
    use utility::time::Date;

    use super::*;

    fn weekday_service(id: &str) -> Service {
        Service::new(
            Id::new(id.to_owned()),
            [true, true, true, true, true, false, false],
            Date::from_yyyymmdd(20240101).unwrap(),
            Date::from_yyyymmdd(20241231).unwrap(),
            vec![],
        )
        .unwrap()
    }

    #[test]
    fn removed_exception_drops_default_service() {
        let default = vec![weekday_service("a"), weekday_service("b")];
        let exceptions = vec![ServiceException {
            service_id: Id::new("a".to_owned()),
            date: Date::from_yyyymmdd(20240305).unwrap(),
            exception_type: ServiceExceptionType::Removed,
        }];
        let effective = effective_services(default, &exceptions);
        assert_eq!(effective.len(), 1);
        assert_eq!(effective[0].id, Id::new("b".to_owned()));
    }

    #[test]
    fn added_exception_is_idempotent_for_already_present_service() {
        let default = vec![weekday_service("a")];
        let exceptions = vec![ServiceException {
            service_id: Id::new("a".to_owned()),
            date: Date::from_yyyymmdd(20240309).unwrap(),
            exception_type: ServiceExceptionType::Added,
        }];
        let effective = effective_services(default, &exceptions);
        assert_eq!(effective.len(), 1);
    }

    #[test]
    fn added_exception_introduces_a_new_service() {
        let exceptions = vec![ServiceException {
            service_id: Id::new("holiday-special".to_owned()),
            date: Date::from_yyyymmdd(20240309).unwrap(),
            exception_type: ServiceExceptionType::Added,
        }];
        let effective = effective_services(vec![], &exceptions);
        assert_eq!(effective.len(), 1);
        assert_eq!(effective[0].id, Id::new("holiday-special".to_owned()));
    }
}
