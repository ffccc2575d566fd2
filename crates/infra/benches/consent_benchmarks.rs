use std::sync::Arc;

use chrono::{Duration, TimeZone, Utc};
use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use serde_json::Value as JsonValue;

use sanctuary_auth::{FieldType, UserRole, build_permission};
use sanctuary_consent::{ConsentEvent, ConsentGranted, ConsentRevoked, ConsentType, GrantConsent};
use sanctuary_core::{ClientId, ConsentId, FixedClock, TenantId};
use sanctuary_events::{EventEnvelope, InMemoryEventBus};
use sanctuary_infra::consent_service::{ConsentService, ConsentServiceConfig};
use sanctuary_infra::event_store::InMemoryEventStore;
use sanctuary_redaction::{ClassifiedRecord, RedactionConfig, Redactor};

type Service = ConsentService<Arc<InMemoryEventStore>, Arc<InMemoryEventBus<EventEnvelope<JsonValue>>>, FixedClock>;

fn service() -> Service {
    ConsentService::with_clock(
        Arc::new(InMemoryEventStore::new()),
        Arc::new(InMemoryEventBus::new()),
        FixedClock::at(Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap()),
        ConsentServiceConfig::default(),
    )
}

/// Seed a ledger with `grants` consents, every other one revoked.
fn seeded(grants: usize) -> (Service, TenantId, ClientId) {
    let svc = service();
    let tenant = TenantId::new();
    let client = ClientId::new();
    let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();

    for i in 0..grants {
        let consent = ConsentId::new();
        let at = t0 + Duration::minutes(i as i64);
        svc.record_consent_event(
            tenant,
            client,
            ConsentEvent::ConsentGranted(
                ConsentGranted::new(&GrantConsent {
                    client_id: client,
                    consent_id: consent,
                    consent_type: ConsentType::InformationSharing,
                    purpose: format!("purpose-{}", i % 8),
                    recipient_organization: "Harbor House".to_string(),
                    recipient_contact: None,
                    granted_by: "client".to_string(),
                    expires_at: None,
                    is_vawa_protected: true,
                    limitations: None,
                    occurred_at: at,
                })
                .expect("valid grant"),
            ),
        )
        .expect("seed grant");
        if i % 2 == 1 {
            svc.record_consent_event(
                tenant,
                client,
                ConsentEvent::ConsentRevoked(
                    ConsentRevoked::new(client, consent, "client", None, at + Duration::seconds(30))
                        .expect("valid revoke"),
                ),
            )
            .expect("seed revoke");
        }
    }
    (svc, tenant, client)
}

fn bench_ledger_replay(c: &mut Criterion) {
    let mut group = c.benchmark_group("ledger_replay");

    for grants in [10usize, 100, 1_000] {
        let (svc, tenant, client) = seeded(grants);
        let events = grants + grants / 2;
        group.throughput(Throughput::Elements(events as u64));
        group.bench_with_input(BenchmarkId::new("status_for_purpose", events), &grants, |b, _| {
            b.iter(|| {
                black_box(
                    svc.consent_status_now(tenant, client, "purpose-3")
                        .expect("status"),
                )
            })
        });
    }

    group.finish();
}

fn bench_redaction(c: &mut Criterion) {
    let mut group = c.benchmark_group("redaction");
    let redactor = Redactor::new(RedactionConfig::new("benchmark-hash-key-0001").expect("bench key"));

    let mut record = ClassifiedRecord::new();
    for (i, field) in FieldType::ALL.iter().cycle().take(60).enumerate() {
        record.insert(format!("field_{i}"), Some(*field), format!("value number {i}").into());
    }

    let callers = [
        ("external_partner", build_permission([UserRole::ExternalPartner], Vec::<&str>::new())),
        ("case_manager", build_permission([UserRole::CaseManager], Vec::<&str>::new())),
        ("dv_advocate", build_permission([UserRole::DvAdvocate], ["DV_VIEW"])),
    ];

    group.throughput(Throughput::Elements(record.len() as u64));
    for (name, build) in &callers {
        group.bench_function(*name, |b| {
            b.iter(|| black_box(redactor.redact(black_box(&record), &build.permission)))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_ledger_replay, bench_redaction);
criterion_main!(benches);
