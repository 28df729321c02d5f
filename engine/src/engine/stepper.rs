//! Day-stepper: the single-threaded simulation loop
//!
//! Each simulated day runs a fixed sequence of phases; the ordering is
//! load-bearing because later phases read state the earlier ones settle:
//!
//! 1. Shipment receipt (arc and storage capacity applied per shipment)
//! 2. Production receipt
//! 3. Customer backorder servicing
//! 4. Customer demand generation
//! 5. Replenishment walk, downstream tiers first
//! 6. Snapshot and cost settlement
//!
//! A `Simulation` owns every piece of mutable run state; nothing is shared,
//! so concurrent runs need no locking.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::costs::{
    reconcile, recompute_daily_pl, CostAccount, CostEntry, CostEventKind, DailyProfitLoss,
    ReconciliationError,
};
use crate::engine::events::{drain_due, DayBook, ProductionOrder, Schedule, Shipment};
use crate::models::{
    ConfigError, DailySnapshot, ItemDayRecord, Node, NodeType, SimulationConfig, TransportLink,
};
use crate::policy::{order_up_to_level, reorder_point_order, service_level_order, OrderConstraints};
use crate::profiles::{build_demand_profiles, replenishment_order, ProfileMap};
use crate::rng::RngManager;

type StockMap = BTreeMap<String, BTreeMap<String, f64>>;

// ============================================================================
// Simulation
// ============================================================================

/// One complete simulation run over the configured horizon
///
/// # Example
///
/// ```
/// use supply_simulator_core_rs::engine::Simulation;
/// use supply_simulator_core_rs::models::{
///     CustomerDemand, Node, NodeCommon, Product, SimulationConfig, StoreNode,
/// };
/// use std::collections::BTreeMap;
///
/// let mut common = NodeCommon::new("S1");
/// common.initial_stock.insert("P1".to_string(), 100.0);
/// let config = SimulationConfig {
///     planning_horizon: 5,
///     products: vec![Product::new("P1")],
///     nodes: vec![Node::Store(StoreNode {
///         common,
///         service_level: 0.95,
///         moq: BTreeMap::new(),
///         order_multiple: BTreeMap::new(),
///     })],
///     customer_demand: vec![CustomerDemand::new("S1", "P1", 10.0, 0.0)],
///     random_seed: Some(42),
///     ..SimulationConfig::default()
/// };
/// let mut sim = Simulation::new(config).unwrap();
/// let (snapshots, profit_loss) = sim.run();
/// assert_eq!(snapshots.len(), 5);
/// assert_eq!(profit_loss.len(), 5);
/// ```
pub struct Simulation {
    config: SimulationConfig,
    nodes: BTreeMap<String, Node>,
    links: BTreeMap<(String, String), TransportLink>,

    stock: StockMap,
    pending_shipments: Schedule<Shipment>,
    pending_production: Schedule<ProductionOrder>,
    /// store → item → carried unmet end-customer demand
    customer_backorders: BTreeMap<String, BTreeMap<String, f64>>,

    node_order: Vec<String>,
    profiles: ProfileMap,
    rng: RngManager,

    snapshots: Vec<DailySnapshot>,
    profit_loss: Vec<DailyProfitLoss>,
    cost_trace: Vec<CostEntry>,
}

impl Simulation {
    /// Validate the configuration and build the run state
    pub fn new(config: SimulationConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        let nodes: BTreeMap<String, Node> = config
            .nodes
            .iter()
            .map(|n| (n.name().to_string(), n.clone()))
            .collect();
        let links: BTreeMap<(String, String), TransportLink> = config
            .network
            .iter()
            .map(|l| ((l.from_node.clone(), l.to_node.clone()), l.clone()))
            .collect();
        let stock: StockMap = config
            .nodes
            .iter()
            .map(|n| (n.name().to_string(), n.common().initial_stock.clone()))
            .collect();

        let profiles = build_demand_profiles(&config);
        let node_order = replenishment_order(&config);
        let rng = match config.random_seed {
            Some(seed) => RngManager::new(seed),
            None => RngManager::from_entropy(),
        };

        Ok(Self {
            config,
            nodes,
            links,
            stock,
            pending_shipments: Schedule::new(),
            pending_production: Schedule::new(),
            customer_backorders: BTreeMap::new(),
            node_order,
            profiles,
            rng,
            snapshots: Vec::new(),
            profit_loss: Vec::new(),
            cost_trace: Vec::new(),
        })
    }

    /// Execute the full horizon
    ///
    /// Returns the per-day snapshots and P&L records, day 1 first.
    pub fn run(&mut self) -> (Vec<DailySnapshot>, Vec<DailyProfitLoss>) {
        for day in 0..self.config.planning_horizon {
            let start_of_day_stock = self.stock.clone();
            let mut book = DayBook::new();

            // STEP 1: deliver shipments due today
            self.receive_shipments(day, &mut book);

            // STEP 2: complete scheduled production
            self.receive_production(day, &mut book);

            // STEP 3: service carried customer backorders from current stock
            self.service_customer_backorders(&mut book);

            // STEP 4: sample and fulfill today's customer demand
            self.generate_customer_demand(&mut book);

            // STEP 5: replenishment walk, stores up to material suppliers
            self.plan_replenishment(day, &mut book);

            // STEP 6: freeze the day into snapshot, trace and P&L
            self.record_snapshot(day, &start_of_day_stock, &book);
            self.settle_costs(day, &book);
        }
        (self.snapshots.clone(), self.profit_loss.clone())
    }

    // ------------------------------------------------------------------
    // Phase 1: shipment receipt
    // ------------------------------------------------------------------

    fn receive_shipments(&mut self, day: u32, book: &mut DayBook) {
        // Cumulative per-arc and per-destination totals for the day; the
        // before/after overage deltas below are taken against these so a
        // unit is never counted as overage twice.
        let mut shipped_so_far: BTreeMap<(String, String), f64> = BTreeMap::new();
        let mut dest_incoming_today: BTreeMap<String, f64> = BTreeMap::new();

        for shipment in drain_due(&mut self.pending_shipments, day) {
            let Shipment {
                item,
                quantity,
                origin,
                destination,
                ..
            } = shipment;

            let arc_key = (origin.clone(), destination.clone());
            let (link_cap, link_allow_over) = self
                .links
                .get(&arc_key)
                .map(|l| (l.capacity_per_day, l.allow_over_capacity))
                .unwrap_or((f64::INFINITY, true));
            let dest_common = self.nodes[&destination].common();
            let storage_cap = dest_common.storage_capacity;
            let storage_allow_over = dest_common.allow_storage_over_capacity;
            let origin_backorders = self.nodes[&origin].common().backorder_enabled;

            let available = stock_of(&self.stock, &origin, &item);
            let request = available.min(quantity);

            let already_shipped = shipped_so_far.get(&arc_key).copied().unwrap_or(0.0);
            let remaining_link_cap = (link_cap - already_shipped).max(0.0);
            let mut candidate = request;
            if !link_allow_over {
                candidate = candidate.min(remaining_link_cap);
            }

            let total_dest_stock: f64 = self.stock[&destination].values().sum();
            let inbound_before = dest_incoming_today.get(&destination).copied().unwrap_or(0.0);
            let remaining_storage = (storage_cap - (total_dest_stock + inbound_before)).max(0.0);
            if !storage_allow_over {
                candidate = candidate.min(remaining_storage);
            }

            let shipped = candidate.min(request).max(0.0);

            book.flows_mut(&origin, &item).demand += quantity;
            if shipped > 0.0 {
                *stock_mut(&mut self.stock, &origin, &item) -= shipped;
                book.flows_mut(&origin, &item).sales += shipped;

                *shipped_so_far.entry(arc_key.clone()).or_default() += shipped;
                let inbound_after = {
                    let entry = dest_incoming_today.entry(destination.clone()).or_default();
                    *entry += shipped;
                    *entry
                };

                if storage_allow_over && storage_cap.is_finite() {
                    let over_before =
                        ((total_dest_stock + inbound_after - shipped) - storage_cap).max(0.0);
                    let over_after = ((total_dest_stock + inbound_after) - storage_cap).max(0.0);
                    let over_added = (over_after - over_before).max(0.0);
                    if over_added > 0.0 {
                        book.add_storage_overage(&destination, over_added);
                    }
                }

                *stock_mut(&mut self.stock, &destination, &item) += shipped;
                book.flows_mut(&destination, &item).incoming += shipped;
                book.add_transport(&origin, &destination, &item, shipped);

                if link_allow_over && link_cap.is_finite() {
                    let cumulative = shipped_so_far[&arc_key];
                    let over_before = ((cumulative - shipped) - link_cap).max(0.0);
                    let over_after = (cumulative - link_cap).max(0.0);
                    let over_added = (over_after - over_before).max(0.0);
                    if over_added > 0.0 {
                        book.add_transport_overage(&origin, &destination, over_added);
                    }
                }
            }

            if quantity > shipped {
                let shortfall = quantity - shipped;
                book.flows_mut(&origin, &item).shortage += shortfall;
                if origin_backorders {
                    self.pending_shipments.entry(day + 1).or_default().push(Shipment {
                        item,
                        quantity: shortfall,
                        origin,
                        destination,
                        is_backorder: true,
                    });
                }
            }
        }
    }

    // ------------------------------------------------------------------
    // Phase 2: production receipt
    // ------------------------------------------------------------------

    fn receive_production(&mut self, day: u32, book: &mut DayBook) {
        for order in drain_due(&mut self.pending_production, day) {
            let common = self.nodes[&order.factory].common();
            let storage_cap = common.storage_capacity;
            let allow_over = common.allow_storage_over_capacity;
            let total_stock: f64 = self.stock[&order.factory].values().sum();
            let remaining_storage = (storage_cap - total_stock).max(0.0);

            let mut receivable = order.quantity;
            if !allow_over {
                receivable = receivable.min(remaining_storage);
            }
            if receivable > 0.0 {
                *stock_mut(&mut self.stock, &order.factory, &order.item) += receivable;
                book.flows_mut(&order.factory, &order.item).produced += receivable;
                if allow_over && storage_cap.is_finite() {
                    let over_after = ((total_stock + receivable) - storage_cap).max(0.0);
                    let over_before = (total_stock - storage_cap).max(0.0);
                    let over_added = (over_after - over_before).max(0.0);
                    if over_added > 0.0 {
                        book.add_storage_overage(&order.factory, over_added);
                    }
                }
            }
            // Truncated remainder only re-queues when capacity is a hard
            // limit; permitted overage was already stored above.
            if receivable < order.quantity && !allow_over {
                self.pending_production
                    .entry(day + 1)
                    .or_default()
                    .push(ProductionOrder {
                        item: order.item,
                        quantity: order.quantity - receivable,
                        factory: order.factory,
                    });
            }
        }
    }

    // ------------------------------------------------------------------
    // Phase 3: customer backorder servicing
    // ------------------------------------------------------------------

    fn service_customer_backorders(&mut self, book: &mut DayBook) {
        let stores: Vec<String> = self
            .config
            .nodes
            .iter()
            .filter(|n| n.node_type() == NodeType::Store)
            .map(|n| n.name().to_string())
            .collect();
        for store in stores {
            let Some(balances) = self.customer_backorders.get(&store) else {
                continue;
            };
            let items: Vec<(String, f64)> = balances
                .iter()
                .filter(|(_, qty)| **qty > 0.0)
                .map(|(item, qty)| (item.clone(), *qty))
                .collect();
            for (item, balance) in items {
                let available = stock_of(&self.stock, &store, &item);
                let shipped = available.min(balance);
                if shipped > 0.0 {
                    *stock_mut(&mut self.stock, &store, &item) -= shipped;
                    if let Some(entry) = self
                        .customer_backorders
                        .get_mut(&store)
                        .and_then(|m| m.get_mut(&item))
                    {
                        *entry -= shipped;
                    }
                    book.flows_mut(&store, &item).sales += shipped;
                }
            }
        }
    }

    // ------------------------------------------------------------------
    // Phase 4: customer demand generation
    // ------------------------------------------------------------------

    fn generate_customer_demand(&mut self, book: &mut DayBook) {
        for index in 0..self.config.customer_demand.len() {
            let demand = self.config.customer_demand[index].clone();
            let sample = self.rng.gauss(demand.demand_mean, demand.demand_std_dev);
            let quantity = sample.round().max(0.0);
            if quantity <= 0.0 {
                continue;
            }
            let store = &demand.store_name;
            let item = &demand.product_name;
            book.flows_mut(store, item).demand += quantity;

            let available = stock_of(&self.stock, store, item);
            let shipped = available.min(quantity);
            if shipped > 0.0 {
                *stock_mut(&mut self.stock, store, item) -= shipped;
                book.flows_mut(store, item).sales += shipped;
            }
            if quantity > shipped {
                let shortfall = quantity - shipped;
                book.flows_mut(store, item).shortage += shortfall;
                let common = self.nodes[store].common();
                if common.backorder_enabled && !common.lost_sales {
                    *self
                        .customer_backorders
                        .entry(store.clone())
                        .or_default()
                        .entry(item.clone())
                        .or_default() += shortfall;
                }
            }
        }
    }

    // ------------------------------------------------------------------
    // Phase 5: replenishment walk
    // ------------------------------------------------------------------

    fn plan_replenishment(&mut self, day: u32, book: &mut DayBook) {
        for node_name in self.node_order.clone() {
            let node = self.nodes[&node_name].clone();
            match &node {
                Node::Store(_) | Node::Warehouse(_) => {
                    self.plan_distribution_node(day, &node, book);
                }
                Node::Factory(factory) => {
                    self.plan_factory_production(day, &node_name, factory);
                    self.plan_factory_components(day, &node, factory, book);
                }
                Node::Material(_) => {}
            }
        }
    }

    /// Service-level replenishment for stores and warehouses
    fn plan_distribution_node(&mut self, day: u32, node: &Node, book: &mut DayBook) {
        let node_name = node.name().to_string();
        let is_store = node.node_type() == NodeType::Store;
        let items: Vec<String> = node.common().initial_stock.keys().cloned().collect();

        for item in items {
            let profile = match self
                .profiles
                .get(&node_name)
                .and_then(|items| items.get(&item))
            {
                Some(p) => *p,
                None => continue,
            };

            let parent = self
                .config
                .network
                .iter()
                .find(|l| l.to_node == node_name)
                .map(|l| l.from_node.clone());
            let link = parent
                .as_ref()
                .and_then(|p| self.links.get(&(p.clone(), node_name.clone())));
            let lead_time = link.map(|l| l.lead_time).unwrap_or(0);
            let review = node.common().review_period_days;

            let on_hand = stock_of(&self.stock, &node_name, &item);
            let pipeline = self.pipeline_incoming(&node_name, &item);
            let mut position = on_hand + pipeline;
            if is_store {
                if !node.common().lost_sales {
                    position -= self
                        .customer_backorders
                        .get(&node_name)
                        .and_then(|m| m.get(&item))
                        .copied()
                        .unwrap_or(0.0);
                }
            } else {
                position -= self.scheduled_outgoing(&node_name, &item);
            }

            let service_level = node.service_level().unwrap_or(0.0);
            let target = order_up_to_level(
                service_level,
                profile.mean,
                profile.std_dev(),
                lead_time,
                review,
            );
            let mut quantity = service_level_order(target, position);
            if quantity <= 0.0 {
                continue;
            }

            match parent {
                Some(parent_name) => {
                    let constraints = self.constraints_for(node, &parent_name, &item);
                    quantity = constraints.apply(quantity);
                    self.place_order(&parent_name, &node_name, &item, quantity, day, book);
                }
                // No upstream arc: the order cannot travel anywhere and is
                // dropped, recorded rather than retried.
                None => book.flows_mut(&node_name, &item).lost_order += quantity,
            }
        }
    }

    /// Finished-goods production scheduling against the aggregated profile
    fn plan_factory_production(
        &mut self,
        day: u32,
        factory_name: &str,
        factory: &crate::models::FactoryNode,
    ) {
        for fg_item in &factory.producible_products {
            let profile = match self
                .profiles
                .get(factory_name)
                .and_then(|items| items.get(fg_item))
            {
                Some(p) => *p,
                None => continue,
            };
            let production_lead = factory.common.lead_time;
            let review = factory.common.review_period_days;

            let on_hand = stock_of(&self.stock, factory_name, fg_item);
            let pipeline: f64 = self
                .pending_production
                .values()
                .flatten()
                .filter(|o| o.factory == factory_name && o.item == *fg_item)
                .map(|o| o.quantity)
                .sum();
            let outgoing = self.scheduled_outgoing(factory_name, fg_item);
            let position = on_hand + pipeline - outgoing;

            let target = order_up_to_level(
                factory.service_level,
                profile.mean,
                profile.std_dev(),
                production_lead,
                review,
            );
            let quantity = service_level_order(target, position);
            if quantity > 0.0 {
                self.pending_production
                    .entry(day + production_lead)
                    .or_default()
                    .push(ProductionOrder {
                        item: fg_item.clone(),
                        quantity,
                        factory: factory_name.to_string(),
                    });
            }
        }
    }

    /// Reorder-point component resupply toward material suppliers
    fn plan_factory_components(
        &mut self,
        day: u32,
        node: &Node,
        factory: &crate::models::FactoryNode,
        book: &mut DayBook,
    ) {
        let factory_name = factory.common.name.clone();
        for (item, reorder_point) in factory.reorder_point.clone() {
            let on_hand = stock_of(&self.stock, &factory_name, &item);
            let position = on_hand + self.pipeline_incoming(&factory_name, &item);
            if position > reorder_point {
                continue;
            }
            let order_up_to = factory
                .order_up_to_level
                .get(&item)
                .copied()
                .unwrap_or(position);
            let mut quantity = reorder_point_order(reorder_point, order_up_to, position);
            if quantity <= 0.0 {
                continue;
            }

            let parent = self
                .config
                .network
                .iter()
                .find(|l| {
                    l.to_node == factory_name
                        && matches!(
                            self.nodes.get(&l.from_node),
                            Some(Node::Material(m)) if m.material_cost.contains_key(&item)
                        )
                })
                .map(|l| l.from_node.clone());

            match parent {
                Some(parent_name) => {
                    let constraints = self.constraints_for(node, &parent_name, &item);
                    quantity = constraints.apply(quantity);
                    self.place_order(&parent_name, &factory_name, &item, quantity, day, book);
                }
                None => book.flows_mut(&factory_name, &item).lost_order += quantity,
            }
        }
    }

    fn constraints_for(&self, node: &Node, parent: &str, item: &str) -> OrderConstraints {
        let link = self.links.get(&(parent.to_string(), node.name().to_string()));
        OrderConstraints::new(
            node.moq_for(item),
            link.map(|l| l.moq_for(item)).unwrap_or(0.0),
            node.order_multiple_for(item),
            link.map(|l| l.order_multiple_for(item)).unwrap_or(0.0),
        )
    }

    /// Schedule a shipment from `supplier` to `customer`; stock moves only
    /// when the shipment is received
    fn place_order(
        &mut self,
        supplier: &str,
        customer: &str,
        item: &str,
        quantity: f64,
        day: u32,
        book: &mut DayBook,
    ) {
        book.flows_mut(customer, item).ordered += quantity;
        let lead_time = self
            .links
            .get(&(supplier.to_string(), customer.to_string()))
            .map(|l| l.lead_time)
            .unwrap_or(0);
        self.pending_shipments
            .entry(day + lead_time)
            .or_default()
            .push(Shipment {
                item: item.to_string(),
                quantity,
                origin: supplier.to_string(),
                destination: customer.to_string(),
                is_backorder: false,
            });
    }

    /// Confirmed quantity still in transit toward a node
    fn pipeline_incoming(&self, node: &str, item: &str) -> f64 {
        self.pending_shipments
            .values()
            .flatten()
            .filter(|s| s.destination == node && s.item == item)
            .map(|s| s.quantity)
            .sum()
    }

    /// Quantity this node has already promised to ship out
    fn scheduled_outgoing(&self, node: &str, item: &str) -> f64 {
        self.pending_shipments
            .values()
            .flatten()
            .filter(|s| s.origin == node && s.item == item)
            .map(|s| s.quantity)
            .sum()
    }

    // ------------------------------------------------------------------
    // Phase 6: snapshot
    // ------------------------------------------------------------------

    fn record_snapshot(&mut self, day: u32, start_stock: &StockMap, book: &DayBook) {
        let mut snapshot = DailySnapshot::new(day + 1);
        let backorder_balances = self.backorder_balances();

        for node_name in self.nodes.keys() {
            let mut items: Vec<String> = start_stock
                .get(node_name)
                .map(|m| m.keys().cloned().collect())
                .unwrap_or_default();
            for item in self.stock[node_name].keys() {
                if !items.contains(item) {
                    items.push(item.clone());
                }
            }
            // Items that only appear through today's events still get a row.
            for item in book.items_for(node_name) {
                if !items.iter().any(|i| i == item) {
                    items.push(item.to_string());
                }
            }
            items.sort();

            let mut node_snapshot: BTreeMap<String, ItemDayRecord> = BTreeMap::new();
            for item in items {
                let flows = book.flows(node_name, &item).cloned().unwrap_or_default();
                let sales = flows.sales;
                let shortage = flows.shortage;
                node_snapshot.insert(
                    item.clone(),
                    ItemDayRecord {
                        start_stock: start_stock
                            .get(node_name)
                            .and_then(|m| m.get(&item))
                            .copied()
                            .unwrap_or(0.0),
                        end_stock: stock_of(&self.stock, node_name, &item),
                        incoming: flows.incoming,
                        // Normalized so demand always equals what was asked
                        // of the node today, including backorder servicing.
                        demand: sales + shortage,
                        sales,
                        shortage,
                        produced: flows.produced,
                        consumption: flows.consumption,
                        ordered_quantity: flows.ordered,
                        lost_order: flows.lost_order,
                        backorder_balance: backorder_balances
                            .get(&(node_name.clone(), item.clone()))
                            .copied()
                            .unwrap_or(0.0),
                    },
                );
            }
            if !node_snapshot.is_empty() {
                snapshot.nodes.insert(node_name.clone(), node_snapshot);
            }
        }
        self.snapshots.push(snapshot);
    }

    /// Outstanding backorders per (node, item): undelivered backorder
    /// shipments attributed to their supplier, plus carried customer
    /// backorders at stores
    fn backorder_balances(&self) -> BTreeMap<(String, String), f64> {
        let mut balances: BTreeMap<(String, String), f64> = BTreeMap::new();
        for shipment in self.pending_shipments.values().flatten() {
            if shipment.is_backorder {
                *balances
                    .entry((shipment.origin.clone(), shipment.item.clone()))
                    .or_default() += shipment.quantity;
            }
        }
        for (store, items) in &self.customer_backorders {
            for (item, qty) in items {
                if *qty > 0.0 {
                    *balances.entry((store.clone(), item.clone())).or_default() += qty;
                }
            }
        }
        balances
    }

    // ------------------------------------------------------------------
    // Phase 6: cost settlement
    // ------------------------------------------------------------------

    fn settle_costs(&mut self, day: u32, book: &DayBook) {
        let day1 = day + 1;
        let mut pl = DailyProfitLoss::new(day1);
        let mut trace: Vec<CostEntry> = Vec::new();

        // Revenue: store sales valued at the product's sales price.
        for ((node_name, item), flows) in &book.node_items {
            if flows.sales <= 0.0 {
                continue;
            }
            if self.nodes[node_name].node_type() != NodeType::Store {
                continue;
            }
            let price = self
                .config
                .product(item)
                .map(|p| p.sales_price)
                .unwrap_or(0.0);
            charge(
                &mut pl,
                &mut trace,
                day1,
                node_name,
                Some(item),
                CostEventKind::Sale,
                flows.sales,
                price,
                flows.sales * price,
                CostAccount::Revenue,
            );
        }

        // Transport. The arc's fixed rate applies once per arc per day; the
        // base variable rate applies to units shipped within capacity, with
        // the overage portion billed separately at the surcharge rate below.
        // Material purchases are valued as the goods leave the material node.
        let mut shipped_by_arc: BTreeMap<(String, String), f64> = BTreeMap::new();
        for ((origin, destination, _), quantity) in &book.transport {
            if *quantity > 0.0 {
                *shipped_by_arc
                    .entry((origin.clone(), destination.clone()))
                    .or_default() += quantity;
            }
        }
        for (arc, total_shipped) in &shipped_by_arc {
            let Some(link) = self.links.get(arc) else {
                continue;
            };
            let origin = &arc.0;
            let origin_type = self.nodes[origin].node_type();
            charge(
                &mut pl,
                &mut trace,
                day1,
                origin,
                None,
                CostEventKind::TransportFixed,
                0.0,
                0.0,
                link.transportation_cost_fixed,
                CostAccount::transport(origin_type, true),
            );
            let over_qty = book.transport_overage.get(arc).copied().unwrap_or(0.0);
            let base_qty = (total_shipped - over_qty).max(0.0);
            charge(
                &mut pl,
                &mut trace,
                day1,
                origin,
                None,
                CostEventKind::TransportVariable,
                base_qty,
                link.transportation_cost_variable,
                link.transportation_cost_variable * base_qty,
                CostAccount::transport(origin_type, false),
            );
        }
        for ((origin, destination, item), quantity) in &book.transport {
            if *quantity <= 0.0 {
                continue;
            }
            if let Some(Node::Material(material)) = self.nodes.get(origin) {
                if self.links.contains_key(&(origin.clone(), destination.clone())) {
                    let unit_cost = material.material_cost.get(item).copied().unwrap_or(0.0);
                    charge(
                        &mut pl,
                        &mut trace,
                        day1,
                        origin,
                        Some(item),
                        CostEventKind::MaterialPurchase,
                        *quantity,
                        unit_cost,
                        unit_cost * quantity,
                        CostAccount::MaterialCost,
                    );
                }
            }
        }

        // Over-capacity transport surcharges, applied to overage units only;
        // the fixed surcharge at most once per arc per day.
        for ((origin, destination), over_qty) in &book.transport_overage {
            if *over_qty <= 0.0 {
                continue;
            }
            let Some(link) = self.links.get(&(origin.clone(), destination.clone())) else {
                continue;
            };
            let origin_type = self.nodes[origin].node_type();
            charge(
                &mut pl,
                &mut trace,
                day1,
                origin,
                None,
                CostEventKind::TransportOverageVariable,
                *over_qty,
                link.over_capacity_variable_cost,
                link.over_capacity_variable_cost * over_qty,
                CostAccount::transport(origin_type, false),
            );
            if link.over_capacity_fixed_cost > 0.0 {
                charge(
                    &mut pl,
                    &mut trace,
                    day1,
                    origin,
                    None,
                    CostEventKind::TransportOverageFixed,
                    *over_qty,
                    0.0,
                    link.over_capacity_fixed_cost,
                    CostAccount::transport(origin_type, true),
                );
            }
        }

        // Production: fixed once per producing factory, variable on the
        // produced quantity, surcharges on the portion beyond capacity.
        let mut produced_by_factory: BTreeMap<String, f64> = BTreeMap::new();
        for ((node_name, _), flows) in &book.node_items {
            if flows.produced > 0.0 {
                *produced_by_factory.entry(node_name.clone()).or_default() += flows.produced;
            }
        }
        for (factory_name, produced) in &produced_by_factory {
            let Node::Factory(factory) = &self.nodes[factory_name] else {
                continue;
            };
            charge(
                &mut pl,
                &mut trace,
                day1,
                factory_name,
                None,
                CostEventKind::ProductionFixed,
                0.0,
                0.0,
                factory.production_cost_fixed,
                CostAccount::ProductionFixed,
            );
            charge(
                &mut pl,
                &mut trace,
                day1,
                factory_name,
                None,
                CostEventKind::ProductionVariable,
                *produced,
                factory.production_cost_variable,
                factory.production_cost_variable * produced,
                CostAccount::ProductionVariable,
            );
            if factory.production_capacity.is_finite() && factory.allow_production_over_capacity {
                let over = (produced - factory.production_capacity).max(0.0);
                if over > 0.0 {
                    charge(
                        &mut pl,
                        &mut trace,
                        day1,
                        factory_name,
                        None,
                        CostEventKind::ProductionOverageVariable,
                        over,
                        factory.production_over_capacity_variable_cost,
                        factory.production_over_capacity_variable_cost * over,
                        CostAccount::ProductionVariable,
                    );
                    if factory.production_over_capacity_fixed_cost > 0.0 {
                        charge(
                            &mut pl,
                            &mut trace,
                            day1,
                            factory_name,
                            None,
                            CostEventKind::ProductionOverageFixed,
                            over,
                            0.0,
                            factory.production_over_capacity_fixed_cost,
                            CostAccount::ProductionFixed,
                        );
                    }
                }
            }
        }

        // Storage: fixed per node per day, variable on end-of-day stock,
        // plus overage surcharges on today's overage quantity.
        for (node_name, node) in &self.nodes {
            let common = node.common();
            let node_type = node.node_type();
            charge(
                &mut pl,
                &mut trace,
                day1,
                node_name,
                None,
                CostEventKind::StorageFixed,
                0.0,
                0.0,
                common.storage_cost_fixed,
                CostAccount::storage(node_type, true),
            );
            for (item, held) in &self.stock[node_name] {
                let rate = common.storage_cost_variable.get(item).copied().unwrap_or(0.0);
                charge(
                    &mut pl,
                    &mut trace,
                    day1,
                    node_name,
                    Some(item),
                    CostEventKind::StorageVariable,
                    *held,
                    rate,
                    held * rate,
                    CostAccount::storage(node_type, false),
                );
            }
            let over_qty = book.storage_overage.get(node_name).copied().unwrap_or(0.0);
            if over_qty > 0.0 {
                charge(
                    &mut pl,
                    &mut trace,
                    day1,
                    node_name,
                    None,
                    CostEventKind::StorageOverageVariable,
                    over_qty,
                    common.storage_over_capacity_variable_cost,
                    common.storage_over_capacity_variable_cost * over_qty,
                    CostAccount::storage(node_type, false),
                );
                charge(
                    &mut pl,
                    &mut trace,
                    day1,
                    node_name,
                    None,
                    CostEventKind::StorageOverageFixed,
                    over_qty,
                    0.0,
                    common.storage_over_capacity_fixed_cost,
                    CostAccount::storage(node_type, true),
                );
            }
        }

        // Stockout penalty on the day's shortage units.
        for ((node_name, item), flows) in &book.node_items {
            if flows.shortage <= 0.0 {
                continue;
            }
            let rate = self.nodes[node_name].common().stockout_cost_per_unit;
            charge(
                &mut pl,
                &mut trace,
                day1,
                node_name,
                Some(item),
                CostEventKind::StockoutPenalty,
                flows.shortage,
                rate,
                rate * flows.shortage,
                CostAccount::PenaltyStockout,
            );
        }

        // Backorder carrying penalty on every quantity still outstanding at
        // end of day, network and customer alike.
        let mut backorder_by_node: BTreeMap<String, f64> = BTreeMap::new();
        for ((node_name, _), qty) in self.backorder_balances() {
            *backorder_by_node.entry(node_name).or_default() += qty;
        }
        for (node_name, qty) in &backorder_by_node {
            if *qty <= 0.0 {
                continue;
            }
            let rate = self.nodes[node_name].common().backorder_cost_per_unit_per_day;
            charge(
                &mut pl,
                &mut trace,
                day1,
                node_name,
                None,
                CostEventKind::BackorderPenalty,
                *qty,
                rate,
                rate * qty,
                CostAccount::PenaltyBackorder,
            );
        }

        pl.finalize();
        self.profit_loss.push(pl);
        self.cost_trace.extend(trace);
    }

    // ------------------------------------------------------------------
    // Post-run interfaces
    // ------------------------------------------------------------------

    pub fn snapshots(&self) -> &[DailySnapshot] {
        &self.snapshots
    }

    pub fn profit_loss(&self) -> &[DailyProfitLoss] {
        &self.profit_loss
    }

    /// Full ordered ledger of atomic cost events; empty before `run`
    pub fn cost_trace(&self) -> &[CostEntry] {
        &self.cost_trace
    }

    /// Re-derive the per-day P&L from the trace alone
    pub fn recompute_pl_from_trace(&self) -> Result<Vec<DailyProfitLoss>, ReconciliationError> {
        recompute_daily_pl(&self.cost_trace, self.profit_loss.len() as u32)
    }

    /// Assert the stepper's own P&L equals the trace replay per day and
    /// account; a failure means a bookkeeping bug, never a business error
    pub fn assert_pl_equals_trace_totals(&self) -> Result<(), ReconciliationError> {
        reconcile(&self.profit_loss, &self.cost_trace)
    }

    /// Post-run aggregate metrics
    pub fn compute_summary(&self) -> SimulationSummary {
        let mut totals: BTreeMap<NodeType, TypeTotals> = BTreeMap::new();
        let mut shortage_by_item: BTreeMap<String, f64> = BTreeMap::new();
        let mut backorder_by_day: Vec<f64> = Vec::new();

        for snapshot in &self.snapshots {
            let mut day_backorders = 0.0;
            for (node_name, items) in &snapshot.nodes {
                let Some(node) = self.nodes.get(node_name) else {
                    continue;
                };
                let bucket = totals.entry(node.node_type()).or_default();
                for (item, record) in items {
                    bucket.demand += record.demand;
                    bucket.sales += record.sales;
                    bucket.shortage += record.shortage;
                    bucket.end_stock_sum += record.end_stock;
                    if node.node_type() == NodeType::Store {
                        *shortage_by_item.entry(item.clone()).or_default() += record.shortage;
                        day_backorders += record.backorder_balance;
                    }
                }
            }
            backorder_by_day.push(day_backorders);
        }

        let days = self.snapshots.len().max(1) as f64;
        let get = |t: NodeType| totals.get(&t).cloned().unwrap_or_default();
        let store = get(NodeType::Store);
        let fill_rate = if store.demand > 0.0 {
            store.sales / store.demand
        } else {
            // No demand at all counts as fully served.
            1.0
        };
        let network_shortage = get(NodeType::Warehouse).shortage
            + get(NodeType::Factory).shortage
            + get(NodeType::Material).shortage;
        let avg_on_hand_by_type: BTreeMap<String, f64> = [
            NodeType::Store,
            NodeType::Warehouse,
            NodeType::Factory,
            NodeType::Material,
        ]
        .into_iter()
        .map(|t| (t.as_str().to_string(), get(t).end_stock_sum / days))
        .collect();

        let (backorder_peak, backorder_peak_day) = backorder_by_day
            .iter()
            .enumerate()
            .fold((0.0_f64, 0_u32), |(peak, peak_day), (index, value)| {
                if *value > peak {
                    (*value, index as u32 + 1)
                } else {
                    (peak, peak_day)
                }
            });

        let revenue_total: f64 = self.profit_loss.iter().map(|pl| pl.revenue).sum();
        let penalty_stockout_total: f64 = self
            .profit_loss
            .iter()
            .map(|pl| pl.penalty_costs.stockout)
            .sum();
        let penalty_backorder_total: f64 = self
            .profit_loss
            .iter()
            .map(|pl| pl.penalty_costs.backorder)
            .sum();
        let cost_total: f64 = self.profit_loss.iter().map(|pl| pl.total_cost).sum();
        let profit_total = revenue_total - cost_total;

        let mut shortages: Vec<(String, f64)> = shortage_by_item.into_iter().collect();
        shortages.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.0.cmp(&b.0))
        });
        let top_shortage_items = shortages
            .into_iter()
            .take(5)
            .map(|(item, shortage)| ShortageItem { item, shortage })
            .collect();

        SimulationSummary {
            planning_days: self.snapshots.len().max(1) as u32,
            fill_rate,
            store_demand_total: store.demand,
            store_sales_total: store.sales,
            customer_shortage_total: store.shortage,
            network_shortage_total: network_shortage,
            avg_on_hand_by_type,
            backorder_peak,
            backorder_peak_day,
            revenue_total,
            cost_total,
            penalty_stockout_total,
            penalty_backorder_total,
            penalty_total: penalty_stockout_total + penalty_backorder_total,
            profit_total,
            profit_per_day_avg: profit_total / days,
            top_shortage_items,
        }
    }
}

// ============================================================================
// Summary types
// ============================================================================

#[derive(Debug, Clone, Default)]
struct TypeTotals {
    demand: f64,
    sales: f64,
    shortage: f64,
    end_stock_sum: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShortageItem {
    pub item: String,
    pub shortage: f64,
}

/// Post-run aggregate metrics over the whole horizon
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationSummary {
    pub planning_days: u32,
    pub fill_rate: f64,
    pub store_demand_total: f64,
    pub store_sales_total: f64,
    pub customer_shortage_total: f64,
    pub network_shortage_total: f64,
    pub avg_on_hand_by_type: BTreeMap<String, f64>,
    pub backorder_peak: f64,
    /// 1-based day of the first peak; 0 when no backorders ever occurred
    pub backorder_peak_day: u32,
    pub revenue_total: f64,
    pub cost_total: f64,
    pub penalty_stockout_total: f64,
    pub penalty_backorder_total: f64,
    pub penalty_total: f64,
    pub profit_total: f64,
    pub profit_per_day_avg: f64,
    pub top_shortage_items: Vec<ShortageItem>,
}

// ============================================================================
// Helpers
// ============================================================================

fn stock_of(stock: &StockMap, node: &str, item: &str) -> f64 {
    stock
        .get(node)
        .and_then(|items| items.get(item))
        .copied()
        .unwrap_or(0.0)
}

fn stock_mut<'a>(stock: &'a mut StockMap, node: &str, item: &str) -> &'a mut f64 {
    stock
        .entry(node.to_string())
        .or_default()
        .entry(item.to_string())
        .or_default()
}

#[allow(clippy::too_many_arguments)]
fn charge(
    pl: &mut DailyProfitLoss,
    trace: &mut Vec<CostEntry>,
    day: u32,
    node: &str,
    item: Option<&str>,
    event: CostEventKind,
    quantity: f64,
    unit_cost: f64,
    amount: f64,
    account: CostAccount,
) {
    if amount == 0.0 {
        return;
    }
    pl.add_account(account, amount);
    trace.push(CostEntry {
        day,
        node: node.to_string(),
        item: item.map(|i| i.to_string()),
        event,
        quantity,
        unit_cost,
        amount,
        account,
    });
}
