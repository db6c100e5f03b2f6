//! Engine wiring shared by the CLI and library callers.
//!
//! The statistical classifier is an explicit dependency of [`QuoteEngine`]:
//! build it once (or leave it out for rules-only quoting) and share the engine
//! by reference. Only [`QuoteEngine::update`] mutates classifier state.
//!
//! Flow for a project:
//! attributes -> features -> rule + statistical tiers -> blended risk
//! -> area-based materials -> labor / risk / tax / margin -> `ProjectQuote`

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info};

use crate::config::EngineConfig;
use crate::domain::{
    LabeledSample, ProjectAttributes, ProjectQuote, ProjectRequest, QuoteBreakdown, QuoteItem, RiskResult,
};
use crate::error::{QuoteError, QuoteResult};
use crate::model::{FileModelStore, StatisticalClassifier};
use crate::pricing::{MaterialCatalog, MaterialEstimate, TaxPolicy, estimate, price, price_items};
use crate::risk::{RiskCombiner, RuleClassifier, normalize};

#[derive(Debug)]
pub struct QuoteEngine {
    rules: RuleClassifier,
    statistical: Option<Arc<StatisticalClassifier>>,
    combiner: RiskCombiner,
    catalog: MaterialCatalog,
    tax: TaxPolicy,
    labor_percent: f64,
    margin_percent: f64,
}

impl QuoteEngine {
    /// Engine with the seeded catalog and default tax, labor and margin.
    pub fn new(statistical: Option<Arc<StatisticalClassifier>>) -> Self {
        let defaults = EngineConfig::default();
        Self {
            rules: RuleClassifier::new(),
            statistical,
            combiner: RiskCombiner::new(),
            catalog: MaterialCatalog::seeded(),
            tax: defaults.tax,
            labor_percent: defaults.labor_percent,
            margin_percent: defaults.margin_percent,
        }
    }

    /// Build from configuration: open the file-backed classifier and load the
    /// catalog file when one is configured.
    pub fn from_config(config: &EngineConfig) -> QuoteResult<Self> {
        let store = FileModelStore::new(&config.model_dir);
        let classifier = StatisticalClassifier::open(Box::new(store), config.statistical)?;

        let catalog = match &config.catalog_path {
            Some(path) => crate::io::read_catalog_json(path)?,
            None => MaterialCatalog::seeded(),
        };

        Ok(Self::new(Some(Arc::new(classifier)))
            .with_catalog(catalog)
            .with_tax(config.tax.clone())
            .with_defaults(config.labor_percent, config.margin_percent))
    }

    pub fn with_catalog(mut self, catalog: MaterialCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    pub fn with_tax(mut self, tax: TaxPolicy) -> Self {
        self.tax = tax;
        self
    }

    pub fn with_combiner(mut self, combiner: RiskCombiner) -> Self {
        self.combiner = combiner;
        self
    }

    /// Labor and margin percents used when a request does not carry its own.
    pub fn with_defaults(mut self, labor_percent: f64, margin_percent: f64) -> Self {
        self.labor_percent = labor_percent;
        self.margin_percent = margin_percent;
        self
    }

    pub fn catalog(&self) -> &MaterialCatalog {
        &self.catalog
    }

    pub fn catalog_mut(&mut self) -> &mut MaterialCatalog {
        &mut self.catalog
    }

    pub fn tax(&self) -> &TaxPolicy {
        &self.tax
    }

    pub fn statistical(&self) -> Option<&StatisticalClassifier> {
        self.statistical.as_deref()
    }

    /// Rule tier blended with the statistical tier when a trained model is available.
    pub fn classify(&self, attrs: &ProjectAttributes) -> RiskResult {
        let features = normalize(attrs);
        let rule = self.rules.classify(&features);
        let stat = self.statistical.as_ref().and_then(|s| s.classify(&features));
        let combined = self.combiner.combine(&rule, stat.as_ref());
        debug!(
            height_m = features.height_m,
            complexity = features.complexity_score,
            environment = features.environment_score,
            rule_tier = rule.tier.display_name(),
            stat_tier = stat.as_ref().map(|s| s.tier.display_name()),
            tier = combined.tier.display_name(),
            multiplier = combined.multiplier,
            "classified"
        );
        combined
    }

    pub fn classify_rules_only(&self, attrs: &ProjectAttributes) -> RiskResult {
        self.rules.classify(&normalize(attrs))
    }

    /// Area-based bill of quantities priced from the engine's catalog.
    pub fn estimate(&self, area_m2: f64) -> MaterialEstimate {
        estimate(area_m2, &self.catalog)
    }

    /// Classify, estimate materials from area, then price.
    pub fn analyze(&self, request: &ProjectRequest) -> QuoteResult<ProjectQuote> {
        let area_m2 = request.effective_area();
        if !(area_m2.is_finite() && area_m2 >= 0.0) {
            return Err(QuoteError::InvalidQuoteInput(format!(
                "area must be finite and >= 0, got {area_m2}"
            )));
        }

        let risk = self.classify(&request.attributes);
        let materials = self.estimate(area_m2);
        let labor = request.labor_percent.unwrap_or(self.labor_percent);
        let margin = request.margin_percent.unwrap_or(self.margin_percent);

        let breakdown = self.price_with(materials, labor, &risk, margin)?;
        let tax = self.tax.assess(breakdown.risk_adjusted_subtotal);

        info!(
            project = %request.name,
            tier = breakdown.risk.tier.display_name(),
            multiplier = breakdown.risk.multiplier,
            total = breakdown.total,
            "quote complete"
        );

        Ok(ProjectQuote {
            project_name: request.name.clone(),
            client: request.client.clone(),
            attributes: request.attributes.clone(),
            area_m2,
            issued_on: Utc::now().date_naive(),
            tax,
            breakdown,
        })
    }

    /// Price explicit catalog items under a caller-supplied risk result.
    pub fn quote_items(
        &self,
        items: &[QuoteItem],
        risk: &RiskResult,
        labor_percent: Option<f64>,
        margin_percent: Option<f64>,
    ) -> QuoteResult<QuoteBreakdown> {
        let materials = price_items(items, &self.catalog)?;
        self.price_with(
            materials,
            labor_percent.unwrap_or(self.labor_percent),
            risk,
            margin_percent.unwrap_or(self.margin_percent),
        )
    }

    /// Retrain the statistical classifier on a labelled batch.
    pub fn update(&self, batch: &[LabeledSample]) -> QuoteResult<bool> {
        let Some(classifier) = &self.statistical else {
            return Err(QuoteError::Config(
                "no statistical classifier configured; cannot update".to_string(),
            ));
        };
        classifier.update(batch)
    }

    fn price_with(
        &self,
        materials: MaterialEstimate,
        labor_percent: f64,
        risk: &RiskResult,
        margin_percent: f64,
    ) -> QuoteResult<QuoteBreakdown> {
        let mut breakdown = price(
            materials.total_cost,
            labor_percent,
            risk,
            self.tax.rate_percent,
            margin_percent,
        )?;
        breakdown.materials = materials.items;
        Ok(breakdown)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Complexity, Environment, FeatureVector, RiskTier};
    use crate::model::{MemoryModelStore, StatisticalSettings};
    use crate::pricing::TUBE_40X40;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-6
    }

    fn small_settings() -> StatisticalSettings {
        StatisticalSettings {
            trees: 25,
            ..StatisticalSettings::default()
        }
    }

    fn request(height: f64, area: f64) -> ProjectRequest {
        ProjectRequest {
            name: "Mezzanine".to_string(),
            client: "ACME".to_string(),
            attributes: ProjectAttributes::new(height, Complexity::High, Environment::OutdoorAdverse),
            area_m2: area,
            length_m: 0.0,
            width_m: 0.0,
            labor_percent: None,
            margin_percent: None,
        }
    }

    #[test]
    fn rules_only_engine_passes_rule_result_through() {
        let engine = QuoteEngine::new(None);
        let attrs = ProjectAttributes::new(4.5, Complexity::High, Environment::OutdoorAdverse);
        let risk = engine.classify(&attrs);
        assert_eq!(risk, engine.classify_rules_only(&attrs));
        assert_eq!(risk.tier, RiskTier::High);
        assert!(close(risk.multiplier, 1.6));
    }

    #[test]
    fn analyze_prices_the_area_estimate() {
        let engine = QuoteEngine::new(None);
        let quote = engine.analyze(&request(4.5, 10.0)).unwrap();

        let b = &quote.breakdown;
        assert_eq!(b.materials.len(), 5);
        assert!(close(b.materials_cost, 1251.7));
        assert!(close(b.labor_cost, 1251.7 * 0.4));
        assert!(close(b.risk_adjusted_subtotal, 1251.7 * 1.4 * 1.6));
        assert!(close(quote.tax.amount, b.tax));
        assert_eq!(quote.tax.regime, "ME - Simples Nacional");
        assert_eq!(quote.area_m2, 10.0);
    }

    #[test]
    fn analyze_derives_area_from_dimensions() {
        let engine = QuoteEngine::new(None);
        let mut req = request(1.0, 0.0);
        req.length_m = 4.0;
        req.width_m = 2.5;
        let quote = engine.analyze(&req).unwrap();
        assert_eq!(quote.area_m2, 10.0);
        assert!(close(quote.breakdown.materials_cost, 1251.7));
    }

    #[test]
    fn request_percents_override_engine_defaults() {
        let engine = QuoteEngine::new(None).with_defaults(50.0, 10.0);
        let mut req = request(0.0, 10.0);
        let q = engine.analyze(&req).unwrap();
        assert_eq!(q.breakdown.labor_percent, 50.0);
        assert_eq!(q.breakdown.margin_percent, 10.0);

        req.labor_percent = Some(0.0);
        req.margin_percent = Some(0.0);
        let q = engine.analyze(&req).unwrap();
        assert_eq!(q.breakdown.labor_cost, 0.0);
        assert_eq!(q.breakdown.margin_amount, 0.0);
    }

    #[test]
    fn negative_area_is_rejected() {
        let engine = QuoteEngine::new(None);
        assert!(matches!(
            engine.analyze(&request(1.0, -3.0)),
            Err(QuoteError::InvalidQuoteInput(_))
        ));
    }

    #[test]
    fn quote_items_uses_catalog_prices() {
        let engine = QuoteEngine::new(None);
        let risk = RiskResult {
            tier: RiskTier::Low,
            multiplier: 1.0,
            justification: String::new(),
        };
        let items = [QuoteItem {
            material_name: TUBE_40X40.to_string(),
            quantity: 10.0,
        }];
        let b = engine.quote_items(&items, &risk, Some(0.0), Some(0.0)).unwrap();
        assert!(close(b.materials_cost, 329.0));
        assert!(close(b.total, 329.0 * 1.06));

        let unknown = [QuoteItem {
            material_name: "Unobtainium".to_string(),
            quantity: 1.0,
        }];
        assert!(matches!(
            engine.quote_items(&unknown, &risk, None, None),
            Err(QuoteError::UnknownMaterial(_))
        ));
    }

    #[test]
    fn blended_classification_stays_in_bounds() {
        let classifier = StatisticalClassifier::open(Box::new(MemoryModelStore::new()), small_settings()).unwrap();
        let engine = QuoteEngine::new(Some(Arc::new(classifier)));
        for height in [0.0, 0.3, 1.0, 3.0, 4.5, 8.0, 20.0] {
            let risk = engine.classify(&ProjectAttributes::new(height, Complexity::Medium, Environment::Outdoor));
            assert!(risk.multiplier >= 1.0 && risk.multiplier <= 2.0, "{height}: {}", risk.multiplier);
        }
    }

    #[test]
    fn update_goes_through_the_injected_classifier() {
        let classifier = StatisticalClassifier::open(Box::new(MemoryModelStore::new()), small_settings()).unwrap();
        let engine = QuoteEngine::new(Some(Arc::new(classifier)));
        let batch = [LabeledSample::new(FeatureVector::new(3.0, 0.5, 0.5), RiskTier::High)];

        assert!(engine.update(&batch).unwrap());
        assert_eq!(engine.statistical().and_then(|s| s.generation()), Some(2));
        assert!(matches!(engine.update(&[]), Err(QuoteError::EmptyBatch)));

        let rules_only = QuoteEngine::new(None);
        assert!(matches!(rules_only.update(&batch), Err(QuoteError::Config(_))));
    }
}
