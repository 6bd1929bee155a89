//! Solidity interface definitions for the Request contracts.
//!
//! Only the functions and events this crate calls or decodes are declared:
//! - [`IRequestCore`]: request storage, sub-payees and the `Created` /
//!   `UpdateBalance` events
//! - [`IRequestEthereum`]: the ether currency contract
//! - [`IRequestERC20`]: the per-token currency contract, whose state-changing
//!   entry points carry an `Action` suffix

use alloy_sol_types::sol;

sol! {
    /// Core contract holding every request, whatever its currency.
    #[allow(missing_docs)]
    #[derive(Debug)]
    interface IRequestCore {
        function getRequest(bytes32 _requestId) external view returns (
            address payer,
            address currencyContract,
            uint8 state,
            address payeeAddr,
            int256 payeeExpectedAmount,
            int256 payeeBalance
        );
        function getSubPayeesCount(bytes32 _requestId) external view returns (uint8);
        function subPayees(bytes32 _requestId, uint256 _index) external view returns (
            address addr,
            int256 expectedAmount,
            int256 balance
        );

        event Created(bytes32 indexed requestId, address indexed payee, address indexed payer, address creator, string data);
        event UpdateBalance(bytes32 indexed requestId, uint8 payeeIndex, int256 deltaAmount);
    }
}

sol! {
    /// Currency contract for requests paid in ether.
    #[allow(missing_docs)]
    #[derive(Debug)]
    interface IRequestEthereum {
        function createRequestAsPayee(
            address[] _payeesIdAddress,
            address[] _payeesPaymentAddress,
            int256[] _expectedAmounts,
            address _payer,
            address _payerRefundAddress,
            string _data
        ) external payable returns (bytes32 requestId);
        function createRequestAsPayer(
            address[] _payeesIdAddress,
            int256[] _expectedAmounts,
            address _payerRefundAddress,
            uint256[] _payeeAmounts,
            uint256[] _additionals,
            string _data
        ) external payable returns (bytes32 requestId);
        function broadcastSignedRequestAsPayer(
            bytes _requestData,
            address[] _payeesPaymentAddress,
            uint256[] _payeeAmounts,
            uint256[] _additionals,
            uint256 _expirationDate,
            bytes _signature
        ) external payable returns (bytes32);
        function paymentAction(bytes32 _requestId, uint256[] _payeeAmounts, uint256[] _additionalAmounts) external payable;
        function refundAction(bytes32 _requestId) external payable;
        function subtractAction(bytes32 _requestId, uint256[] _subtractAmounts) external;
        function additionalAction(bytes32 _requestId, uint256[] _additionalAmounts) external;
        function accept(bytes32 _requestId) external;
        function cancel(bytes32 _requestId) external;

        function payeesPaymentAddress(bytes32 _requestId, uint8 _payeeIndex) external view returns (address);
        function payerRefundAddress(bytes32 _requestId) external view returns (address);
        function collectEstimation(int256 _expectedAmount) external view returns (uint256);
    }
}

sol! {
    /// Currency contract for requests paid in one ERC-20 token.
    #[allow(missing_docs)]
    #[derive(Debug)]
    interface IRequestERC20 {
        function createRequestAsPayeeAction(
            address[] _payeesIdAddress,
            address[] _payeesPaymentAddress,
            int256[] _expectedAmounts,
            address _payer,
            address _payerRefundAddress,
            string _data
        ) external payable returns (bytes32 requestId);
        function createRequestAsPayerAction(
            address[] _payeesIdAddress,
            int256[] _expectedAmounts,
            address _payerRefundAddress,
            uint256[] _payeeAmounts,
            uint256[] _additionals,
            string _data
        ) external payable returns (bytes32 requestId);
        function broadcastSignedRequestAsPayerAction(
            bytes _requestData,
            address[] _payeesPaymentAddress,
            uint256[] _payeeAmounts,
            uint256[] _additionals,
            uint256 _expirationDate,
            bytes _signature
        ) external payable returns (bytes32);
        function paymentAction(bytes32 _requestId, uint256[] _payeeAmounts, uint256[] _additionalAmounts) external;
        function refundAction(bytes32 _requestId, uint256 _amountToRefund) external;
        function subtractAction(bytes32 _requestId, uint256[] _subtractAmounts) external;
        function additionalAction(bytes32 _requestId, uint256[] _additionalAmounts) external;
        function accept(bytes32 _requestId) external;
        function cancel(bytes32 _requestId) external;

        function payeesPaymentAddress(bytes32 _requestId, uint8 _payeeIndex) external view returns (address);
        function payerRefundAddress(bytes32 _requestId) external view returns (address);
        function collectEstimation(int256 _expectedAmount) external view returns (uint256);
    }
}
