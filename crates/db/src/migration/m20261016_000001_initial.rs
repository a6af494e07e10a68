//! Initial database migration.
//!
//! Creates the companies table, both principal tables, the subscription
//! history, and payment records.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();

        // ============================================================
        // PART 1: TENANTS & PRINCIPALS
        // ============================================================
        db.execute_unprepared(COMPANIES_SQL).await?;
        db.execute_unprepared(PRINCIPALS_SQL).await?;
        db.execute_unprepared(COMPANY_PRINCIPALS_SQL).await?;

        // ============================================================
        // PART 2: BILLING
        // ============================================================
        db.execute_unprepared(SUBSCRIPTION_EVENTS_SQL).await?;
        db.execute_unprepared(PAYMENTS_SQL).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(DROP_SQL).await?;
        Ok(())
    }
}

const COMPANIES_SQL: &str = r"
CREATE TABLE companies (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    name VARCHAR(255) NOT NULL,
    admin_principal_id UUID,

    -- Entitlement mirror
    subscription_status VARCHAR(20) NOT NULL DEFAULT 'inactive',
    plan_id VARCHAR(100),
    subscription_end_date TIMESTAMPTZ,

    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),

    CONSTRAINT chk_companies_status CHECK (subscription_status IN ('active', 'inactive'))
);

CREATE INDEX idx_companies_admin ON companies(admin_principal_id);
";

const PRINCIPALS_SQL: &str = r"
CREATE TABLE principals (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    email VARCHAR(255) NOT NULL,
    full_name VARCHAR(255) NOT NULL,
    password_hash VARCHAR(255) NOT NULL,
    role VARCHAR(50) NOT NULL DEFAULT 'pharmacist',
    account_kind VARCHAR(20) NOT NULL DEFAULT 'individual',
    approved BOOLEAN NOT NULL DEFAULT false,
    company_id UUID REFERENCES companies(id) ON DELETE SET NULL,

    -- Entitlement mirror
    subscription_status VARCHAR(20) NOT NULL DEFAULT 'inactive',
    plan_id VARCHAR(100),
    subscription_end_date TIMESTAMPTZ,

    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),

    CONSTRAINT chk_principals_kind CHECK (account_kind IN ('individual', 'company', 'company_user')),
    CONSTRAINT chk_principals_status CHECK (subscription_status IN ('active', 'inactive'))
);

CREATE UNIQUE INDEX idx_principals_email ON principals(lower(email));
CREATE INDEX idx_principals_company ON principals(company_id) WHERE company_id IS NOT NULL;
";

const COMPANY_PRINCIPALS_SQL: &str = r"
CREATE TABLE company_principals (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    email VARCHAR(255) NOT NULL,
    full_name VARCHAR(255) NOT NULL,
    password_hash VARCHAR(255) NOT NULL,
    role VARCHAR(50) NOT NULL DEFAULT 'company_user',
    account_kind VARCHAR(20) NOT NULL DEFAULT 'company_user',
    approved BOOLEAN NOT NULL DEFAULT true,
    company_id UUID REFERENCES companies(id) ON DELETE CASCADE,

    -- Entitlement mirror
    subscription_status VARCHAR(20) NOT NULL DEFAULT 'inactive',
    plan_id VARCHAR(100),
    subscription_end_date TIMESTAMPTZ,

    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),

    CONSTRAINT chk_company_principals_kind CHECK (account_kind IN ('individual', 'company', 'company_user')),
    CONSTRAINT chk_company_principals_status CHECK (subscription_status IN ('active', 'inactive'))
);

CREATE UNIQUE INDEX idx_company_principals_email ON company_principals(lower(email));
CREATE INDEX idx_company_principals_company ON company_principals(company_id);
";

const SUBSCRIPTION_EVENTS_SQL: &str = r"
-- Append-only; the source of truth behind every mirror
CREATE TABLE subscription_events (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    principal_id UUID NOT NULL,
    company_id UUID REFERENCES companies(id) ON DELETE SET NULL,
    plan_id VARCHAR(100) NOT NULL,
    status VARCHAR(20) NOT NULL DEFAULT 'active',
    start_date TIMESTAMPTZ NOT NULL,
    end_date TIMESTAMPTZ NOT NULL,
    tx_ref VARCHAR(100) NOT NULL UNIQUE,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),

    CONSTRAINT chk_subscription_events_range CHECK (end_date > start_date)
);

CREATE INDEX idx_subscription_events_principal ON subscription_events(principal_id, start_date DESC);
CREATE INDEX idx_subscription_events_company_active
    ON subscription_events(company_id, end_date DESC)
    WHERE status = 'active';
";

const PAYMENTS_SQL: &str = r"
CREATE TABLE payments (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    tx_ref VARCHAR(100) NOT NULL UNIQUE,
    principal_email VARCHAR(255) NOT NULL,
    plan_id VARCHAR(100) NOT NULL,
    amount NUMERIC(14, 2) NOT NULL,
    currency CHAR(3) NOT NULL,
    status VARCHAR(20) NOT NULL DEFAULT 'pending',
    gateway_response JSONB NOT NULL DEFAULT 'null',
    paid_at TIMESTAMPTZ,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),

    CONSTRAINT chk_payments_amount CHECK (amount > 0),
    CONSTRAINT chk_payments_status CHECK (status IN ('pending', 'paid', 'failed')),
    CONSTRAINT chk_payments_paid_at CHECK (status <> 'paid' OR paid_at IS NOT NULL)
);

CREATE INDEX idx_payments_pending ON payments(created_at) WHERE status = 'pending';
CREATE INDEX idx_payments_email ON payments(lower(principal_email));
";

const DROP_SQL: &str = r"
DROP TABLE IF EXISTS payments CASCADE;
DROP TABLE IF EXISTS subscription_events CASCADE;
DROP TABLE IF EXISTS company_principals CASCADE;
DROP TABLE IF EXISTS principals CASCADE;
DROP TABLE IF EXISTS companies CASCADE;
";
