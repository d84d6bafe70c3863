use trust_dns_resolver::Resolver;
use trust_dns_resolver::error::ResolveErrorKind;

use super::MxRecord;
use crate::error::ResolveFailure;

/// Seam for injecting a stub resolver in tests. Object-safe so `MxResolver`
/// can stay a concrete, non-generic public type while still being testable.
pub(crate) trait LookupMx {
    fn lookup_mx(&self, domain: &str) -> Result<Vec<MxRecord>, ResolveFailure>;
}

impl LookupMx for Resolver {
    fn lookup_mx(&self, domain: &str) -> Result<Vec<MxRecord>, ResolveFailure> {
        match self.mx_lookup(domain) {
            Ok(lookup) => {
                let records = lookup
                    .iter()
                    .map(|mx| {
                        let exchange = mx.exchange().to_utf8();
                        MxRecord::new(mx.preference(), normalize_exchange(&exchange))
                    })
                    .collect();
                Ok(records)
            }
            Err(err) => match err.kind() {
                ResolveErrorKind::NoRecordsFound { .. } => Ok(Vec::new()),
                _ => Err(ResolveFailure::Lookup { source: err }),
            },
        }
    }
}

fn normalize_exchange(exchange: &str) -> String {
    exchange.trim_end_matches('.').to_ascii_lowercase()
}

/// Resolves a domain to its priority-ordered MX hosts.
///
/// `resolve` never fails: DNS errors of any kind (NXDOMAIN, no records,
/// network failure, resolver-init failure) collapse to an empty list, which
/// `Verifier` treats as "no mail route" rather than an exception.
pub struct MxResolver {
    lookup: Box<dyn LookupMx + Send + Sync>,
}

impl MxResolver {
    /// Build a resolver using the platform's system DNS configuration.
    pub fn from_system_conf() -> Result<Self, ResolveFailure> {
        let lookup = Resolver::from_system_conf().map_err(|source| ResolveFailure::Init { source })?;
        Ok(Self {
            lookup: Box::new(lookup),
        })
    }

    pub(crate) fn with_lookup(lookup: impl LookupMx + Send + Sync + 'static) -> Self {
        Self {
            lookup: Box::new(lookup),
        }
    }

    /// Test-only seam for modules outside `mx` (e.g. `verifier`'s own test
    /// suite) that can't name the crate-private [`LookupMx`] trait directly.
    #[cfg(test)]
    pub(crate) fn with_lookup_for_tests<F>(f: F) -> Self
    where
        F: Fn(&str) -> Result<Vec<MxRecord>, ResolveFailure> + Send + Sync + 'static,
    {
        struct ClosureLookup<F>(F);
        impl<F> LookupMx for ClosureLookup<F>
        where
            F: Fn(&str) -> Result<Vec<MxRecord>, ResolveFailure> + Send + Sync,
        {
            fn lookup_mx(&self, domain: &str) -> Result<Vec<MxRecord>, ResolveFailure> {
                (self.0)(domain)
            }
        }
        Self::with_lookup(ClosureLookup(f))
    }

    /// Ascending-priority MX hosts for `domain`. Ties keep resolver order
    /// (Rust's `sort_by_key` is stable), never randomized.
    pub fn resolve(&self, domain: &str) -> Vec<MxRecord> {
        match self.lookup.lookup_mx(domain) {
            Ok(mut records) => {
                records.sort_by_key(|r| r.priority);
                records
            }
            Err(err) => {
                tracing::warn!(target: "smtpverify::mx", domain, error = %err, "MX lookup failed, treating as no mail route");
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct StubResolver<F>(F);

    impl<F> LookupMx for StubResolver<F>
    where
        F: Fn(&str) -> Result<Vec<MxRecord>, ResolveFailure> + Send + Sync,
    {
        fn lookup_mx(&self, domain: &str) -> Result<Vec<MxRecord>, ResolveFailure> {
            (self.0)(domain)
        }
    }

    #[test]
    fn sorts_ascending_by_priority() {
        let stub = StubResolver(|domain: &str| {
            assert_eq!(domain, "example.com");
            Ok(vec![
                MxRecord::new(30, "mx3.example.com"),
                MxRecord::new(10, "mx1.example.com"),
                MxRecord::new(20, "mx2.example.com"),
            ])
        });
        let resolver = MxResolver::with_lookup(stub);
        let records = resolver.resolve("example.com");
        assert_eq!(
            records.iter().map(|r| r.priority).collect::<Vec<_>>(),
            vec![10, 20, 30]
        );
    }

    #[test]
    fn ties_preserve_resolver_order() {
        let stub = StubResolver(|_: &str| {
            Ok(vec![
                MxRecord::new(10, "a.example.com"),
                MxRecord::new(10, "b.example.com"),
            ])
        });
        let resolver = MxResolver::with_lookup(stub);
        let records = resolver.resolve("example.com");
        assert_eq!(records[0].exchange, "a.example.com");
        assert_eq!(records[1].exchange, "b.example.com");
    }

    #[test]
    fn lookup_failure_yields_empty_list() {
        let stub = StubResolver(|_: &str| {
            Err(ResolveFailure::Init {
                source: std::io::Error::other("boom"),
            })
        });
        let resolver = MxResolver::with_lookup(stub);
        assert!(resolver.resolve("example.com").is_empty());
    }

    #[test]
    fn no_records_found_yields_empty_list() {
        let stub = StubResolver(|_: &str| Ok(Vec::new()));
        let resolver = MxResolver::with_lookup(stub);
        assert!(resolver.resolve("example.com").is_empty());
    }
}
