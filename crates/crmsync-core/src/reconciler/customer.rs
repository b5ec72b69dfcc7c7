use tracing::{debug, info};

use super::{compensate, Reconciler};
use crate::{
    domain::InstanceId,
    records::{Customer, Integration, NewCustomer},
    rpc::{CustomerPayload, RpcAction, RpcRequest},
    Result,
};

impl Reconciler {
    /// Find the customer for `phone_number`, or create and register it remotely.
    ///
    /// Fails with `Error::NotFound` (nothing created) when the instance has no integration.
    pub async fn resolve_customer(
        &self,
        phone_number: &str,
        name: &str,
        instance: &InstanceId,
    ) -> Result<Customer> {
        let integration = self
            .deps
            .integrations
            .find_integration(instance, &self.opts.channel_kind)
            .await?;
        self.resolve_customer_for(&integration, phone_number, name)
            .await
    }

    /// Same as [`Reconciler::resolve_customer`] with the integration already looked up.
    pub async fn resolve_customer_for(
        &self,
        integration: &Integration,
        phone_number: &str,
        name: &str,
    ) -> Result<Customer> {
        let _guard = self.lock_key(format!("customer:{phone_number}")).await;

        if let Some(existing) = self.deps.customers.find_by_phone(phone_number).await? {
            debug!(customer_id = %existing.id, phone_number, "customer already known");
            return Ok(existing);
        }

        let mut customer = self
            .deps
            .customers
            .create(NewCustomer {
                phone_number: phone_number.to_string(),
                name: name.to_string(),
                integration_id: integration.id.clone(),
            })
            .await?;
        debug!(customer_id = %customer.id, phone_number, "created local customer");

        let linked = async {
            let req = RpcRequest::new(
                RpcAction::GetCreateUpdateCustomer,
                &CustomerPayload {
                    integration_id: &integration.remote_id,
                    first_name: name,
                    phones: [phone_number],
                    primary_phone: phone_number,
                    is_user: true,
                },
            )?;
            customer.remote_id = Some(self.call_for_id(req).await?);
            self.deps.customers.save(&customer).await
        }
        .await;

        if let Err(e) = linked {
            compensate(
                "customer",
                customer.id.as_str(),
                &e,
                self.deps.customers.delete(&customer.id),
            )
            .await;
            return Err(e);
        }

        info!(
            customer_id = %customer.id,
            remote_id = ?customer.remote_id,
            phone_number,
            "customer linked"
        );
        Ok(customer)
    }
}
